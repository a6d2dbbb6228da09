//! ---
//! sig_section: "04-tooling-interfaces"
//! sig_subsection: "integration-tests"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "End-to-end checks of the signalsctl binary."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::{json, Value};

fn signalsctl() -> Command {
    let mut cmd = Command::cargo_bin("signalsctl").expect("binary built");
    cmd.env_remove("SIGNALS_CONFIG").env("SIGNALS_LOG", "warn");
    cmd
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

fn write(dir: &Path, name: &str, value: Value) -> String {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).expect("write fixture");
    path.display().to_string()
}

#[test]
fn version_flag_prints_schema_banner() {
    let output = signalsctl().arg("-V").output().expect("run");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("schema v2"));
}

#[test]
fn types_lists_commands_and_aggregate() {
    let output = signalsctl().arg("types").output().expect("run");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("command\tthings.commands:createThing"));
    assert!(text.contains("response\tdevops.responses:aggregatedResponse"));
}

#[test]
fn inspect_reemits_at_requested_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "create.json",
        json!({
            "type": "things.commands:createThing",
            "thingId": "org.example:lamp",
            "__schemaVersion": 1,
            "attributes": {"color": "red"}
        }),
    );

    let output = signalsctl()
        .args(["inspect", &file, "--schema-version", "1"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output.stdout),
        json!({
            "type": "things.commands:createThing",
            "thingId": "org.example:lamp",
            "attributes": {"color": "red"}
        })
    );

    let all = signalsctl()
        .args(["inspect", &file, "--predicate", "all", "--header", "version=2"])
        .output()
        .expect("run");
    assert!(all.status.success());
    assert_eq!(stdout_json(&all.stdout)["__schemaVersion"], json!(2));
}

#[test]
fn inspect_rejects_v1_header_for_v2_only_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "policy.json",
        json!({
            "type": "things.commands:modifyPolicyId",
            "thingId": "org.example:lamp",
            "policyId": "org.example:policy"
        }),
    );
    let output = signalsctl()
        .args(["inspect", &file, "--header", "version=1"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("schema version"));
}

#[test]
fn aggregate_nests_by_origin() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reply = |service: Option<&str>, instance: Option<i32>, level: &str| {
        let mut value = json!({
            "type": "devops.responses:retrieveLoggerConfig",
            "status": 200,
            "loggerConfigs": [{"logger": "root", "level": level}]
        });
        if let Some(service) = service {
            value["serviceName"] = json!(service);
        }
        if let Some(instance) = instance {
            value["instance"] = json!(instance);
        }
        value
    };
    let a0 = write(dir.path(), "a0.json", reply(Some("A"), Some(0), "INFO"));
    let a1 = write(dir.path(), "a1.json", reply(Some("A"), Some(1), "DEBUG"));
    let bare = write(dir.path(), "bare.json", reply(None, None, "WARN"));

    let output = signalsctl()
        .args([
            "aggregate",
            &format!("A:0={}", a0),
            &format!("A:1={}", a1),
            &format!("={}", bare),
        ])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output.stdout);
    assert_eq!(json["type"], json!("devops.responses:aggregatedResponse"));
    assert_eq!(json["responsesType"], json!("devops.responses:retrieveLoggerConfig"));
    let responses = json["responses"].as_object().expect("responses object");
    assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["A", "empty"]);
    assert_eq!(
        json["responses"]["A"]["1"]["loggerConfigs"][0]["level"],
        json!("DEBUG")
    );
    assert!(json["responses"]["empty"]["-1"].is_object());
}

#[test]
fn aggregate_refuses_mixed_response_types() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logger = write(
        dir.path(),
        "logger.json",
        json!({
            "type": "devops.responses:retrieveLoggerConfig",
            "status": 200,
            "loggerConfigs": []
        }),
    );
    let delete = write(
        dir.path(),
        "delete.json",
        json!({
            "type": "things.responses:deleteAttribute",
            "status": 204,
            "thingId": "x:y",
            "attribute": "/a"
        }),
    );
    let output = signalsctl()
        .args(["aggregate", &format!("A:0={}", logger), &format!("A:1={}", delete)])
        .output()
        .expect("run");
    assert!(!output.status.success());
}

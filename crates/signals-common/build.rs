//! ---
//! sig_section: "01-core-functionality"
//! sig_subsection: "module"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Build metadata emission for version reporting."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Git metadata is injected through SIGNALS_GIT_SHA so source tarballs build too.
    EmitBuilder::builder().all_build().all_cargo().emit()?;

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SIGNALS_GIT_SHA");
    Ok(())
}


use std::error::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

/// Fallback used when no git metadata is available and no override is provided
const UNKNOWN_DESCRIBE: &str = "unknown";

/// Emits VERGEN_GIT_DESCRIBE (and the other git variables) from the local checkout.
/// # Errors
/// * if `git` is not installed
/// * if the sources are not inside a git checkout, e.g. a release tarball
fn emit_git_describe() -> Result<(), Box<dyn Error>> {
    let gitcl = GitclBuilder::default()
        .all()
        .describe(false, true, Some("NoTagShouldEverMatchThisPattern"))
        .build()?;

    Emitter::default()
        .fail_on_error()
        .add_instructions(&gitcl)?
        .emit()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    if emit_git_describe().is_err() {
        // packagers can set CUSTOM_VERGEN_GIT_DESCRIBE to stamp a build without git
        let describe = option_env!("CUSTOM_VERGEN_GIT_DESCRIBE").unwrap_or(UNKNOWN_DESCRIBE);
        println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE={describe}");
    }

    for tracked in ["Cargo.toml", "src"] {
        println!("cargo:rerun-if-changed={tracked}");
    }
    Ok(())
}

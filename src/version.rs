//! Build-time version information.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit SHA (short) at build time, or "unknown" if unavailable.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Full build version: `{version}+{sha}`, with a `.dirty` suffix when the
/// working tree was dirty at build time.
pub fn build_version() -> String {
    let dirty = if option_env!("VERGEN_GIT_DIRTY") == Some("true") {
        ".dirty"
    } else {
        ""
    };
    format!(
        "{PKG_VERSION}+{}{dirty}",
        &GIT_SHA[..7.min(GIT_SHA.len())]
    )
}

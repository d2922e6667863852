//! Cache generation token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier distinguishing one deployed generation of cached resources
/// from the next.
///
/// Cache names are qualified with the token (`"{base}-{token}"`); on
/// activation, every cache not owned by the current token is deleted in
/// bulk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Qualify a cache base name with this token.
    pub fn qualify(&self, base: &str) -> String {
        format!("{base}-{}", self.0)
    }

    /// Whether a qualified cache name belongs to this generation.
    pub fn owns(&self, cache_name: &str) -> bool {
        cache_name
            .strip_suffix(self.0.as_str())
            .is_some_and(|rest| rest.ends_with('-'))
    }
}

impl Default for VersionToken {
    fn default() -> Self {
        Self::new(crate::version::PKG_VERSION)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

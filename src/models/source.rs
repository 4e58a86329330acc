//! Where a source image lives in the remote store.

use std::fmt;

/// Top-level folder of the remote store a source image is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// User uploads, addressed by base64-encoded relative paths.
    Uploads,
    /// Advertising assets, addressed by literal file names.
    Ads,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploads => "uploads",
            Self::Ads => "ads",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved fetch address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub namespace: Namespace,
    /// Path below the namespace folder.
    pub relative_path: String,
    /// Absolute URL handed to the source store.
    pub url: String,
}

use thiserror::Error;

use crate::manifest::types::ProjectIdentity;

/// Failure to obtain a project's manifest
///
/// Causes are carried as strings so the error can be cloned to every caller
/// waiting on the same coalesced fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("Manifest not found for {0}")]
    NotFound(ProjectIdentity),

    #[error("Failed to parse manifest: {0}")]
    Parse(String),

    #[error("Failed to fetch manifest: {0}")]
    FetchFailed(String),

    #[error("Timed out fetching manifest")]
    Timeout,
}

impl From<reqwest::Error> for ManifestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ManifestError::Timeout
        } else {
            ManifestError::FetchFailed(e.to_string())
        }
    }
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Invalid package name: {0:?}")]
    InvalidName(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Timed out looking up package")]
    Timeout,
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RegistryError::Timeout
        } else {
            RegistryError::LookupFailed(e.to_string())
        }
    }
}

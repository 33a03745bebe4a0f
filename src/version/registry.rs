//! Registry trait for looking up the latest published version of a package

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;

/// Trait for fetching the latest version of a package from a registry
///
/// Implementations issue exactly one lookup per call: no retries and no caching.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the highest version currently published for the exact package name
    ///
    /// # Returns
    /// * `Ok(String)` - The latest version string
    /// * `Err(RegistryError::InvalidName)` - The name breaks the registry's naming rules
    /// * `Err(RegistryError)` - Network failure, non-success status or malformed response
    async fn latest_version(&self, package_name: &str) -> Result<String, RegistryError>;
}

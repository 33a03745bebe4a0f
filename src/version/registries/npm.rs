//! npm registry API implementation

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{DEFAULT_REGISTRY_BASE_URL, USER_AGENT};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::find_semantic_max;

/// Longest package name the npm registry accepts
const MAX_NAME_LENGTH: usize = 214;

/// Optional `@scope/` prefix followed by URL-safe name characters.
/// Upper case is accepted because legacy packages (e.g. `JSONStream`) still use it.
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@[A-Za-z0-9~-][A-Za-z0-9._~-]*/)?[A-Za-z0-9~-][A-Za-z0-9._~-]*$")
        .expect("valid npm name regex")
});

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
}

/// Registry implementation for npm registry API
#[derive(Clone)]
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check a package name against npm's naming rules
    pub fn validate_name(package_name: &str) -> Result<(), RegistryError> {
        let valid = !package_name.is_empty()
            && package_name.len() <= MAX_NAME_LENGTH
            && !package_name.starts_with('.')
            && !package_name.starts_with('_')
            && NAME_PATTERN.is_match(package_name);

        if valid {
            Ok(())
        } else {
            Err(RegistryError::InvalidName(package_name.to_string()))
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn latest_version(&self, package_name: &str) -> Result<String, RegistryError> {
        Self::validate_name(package_name)?;

        let url = format!(
            "{}/{}",
            self.base_url,
            Self::encode_package_name(package_name)
        );
        debug!("Looking up {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::LookupFailed(format!(
                "Package not found: {}",
                package_name
            )));
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::LookupFailed(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let package_info: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::LookupFailed(e.to_string())
        })?;

        // dist-tags.latest is what `npm install` picks; fall back to semantic max
        if let Some(latest) = package_info.dist_tags.get("latest") {
            return Ok(latest.clone());
        }

        find_semantic_max(package_info.versions.keys()).ok_or_else(|| {
            RegistryError::LookupFailed(format!("No published versions for {}", package_name))
        })
    }
}

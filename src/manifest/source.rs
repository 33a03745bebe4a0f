//! Manifest hosting service clients

#[cfg(test)]
use mockall::automock;

use tracing::{debug, warn};

use crate::config::{
    DEFAULT_MANIFEST_BASE_URL, DEFAULT_MANIFEST_PATH, DEFAULT_MANIFEST_REF, USER_AGENT,
};
use crate::manifest::error::ManifestError;
use crate::manifest::types::ProjectIdentity;

/// Trait for retrieving a project's raw manifest document
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetches the manifest document for a project
    ///
    /// # Returns
    /// * `Ok(String)` - The raw document body
    /// * `Err(ManifestError::NotFound)` - The project or its manifest does not exist
    /// * `Err(ManifestError)` - Any other transport failure
    async fn fetch_document(&self, project: &ProjectIdentity) -> Result<String, ManifestError>;
}

/// Reads package.json from GitHub's raw content host
#[derive(Clone)]
pub struct GitHubManifestSource {
    client: reqwest::Client,
    base_url: String,
    git_ref: String,
    path: String,
}

impl GitHubManifestSource {
    /// Creates a new GitHubManifestSource with a custom base URL, ref and manifest path
    pub fn new(base_url: &str, git_ref: &str, path: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            git_ref: git_ref.to_string(),
            path: path.trim_start_matches('/').to_string(),
        }
    }

    /// Deterministic manifest URL for a project
    pub fn manifest_url(&self, project: &ProjectIdentity) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.base_url, project.owner, project.repo, self.git_ref, self.path
        )
    }
}

impl Default for GitHubManifestSource {
    fn default() -> Self {
        Self::new(
            DEFAULT_MANIFEST_BASE_URL,
            DEFAULT_MANIFEST_REF,
            DEFAULT_MANIFEST_PATH,
        )
    }
}

#[async_trait::async_trait]
impl ManifestSource for GitHubManifestSource {
    async fn fetch_document(&self, project: &ProjectIdentity) -> Result<String, ManifestError> {
        let url = self.manifest_url(project);
        debug!("Fetching manifest {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ManifestError::NotFound(project.clone()));
        }

        if !status.is_success() {
            warn!("Manifest host returned status {}: {}", status, url);
            return Err(ManifestError::FetchFailed(format!(
                "Unexpected status: {}",
                status
            )));
        }

        Ok(response.text().await?)
    }
}

//! Cached manifest retrieval

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{Lookup, TtlCache};
use crate::manifest::error::ManifestError;
use crate::manifest::parser::parse_package_json;
use crate::manifest::source::ManifestSource;
use crate::manifest::types::{Manifest, ProjectIdentity};
use crate::stats::Stats;

/// Retrieves manifests through a [`ManifestSource`], caching successes per project
///
/// Every successful call records a "manifest fetched" event. A network fetch whose
/// dependencies differ from the previously cached manifest (or with nothing cached)
/// additionally records a "manifest updated" event.
pub struct ManifestFetcher {
    source: Arc<dyn ManifestSource>,
    cache: TtlCache<ProjectIdentity, Arc<Manifest>>,
    stats: Arc<Stats>,
    timeout: Duration,
}

impl ManifestFetcher {
    pub fn new(
        source: Arc<dyn ManifestSource>,
        stats: Arc<Stats>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache: TtlCache::new(ttl),
            stats,
            timeout,
        }
    }

    /// Bound the manifest cache to `max_entries` projects
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.cache = TtlCache::with_max_entries(self.cache.ttl(), max_entries);
        self
    }

    pub async fn get_manifest(
        &self,
        project: &ProjectIdentity,
    ) -> Result<Arc<Manifest>, ManifestError> {
        if let Lookup::Fresh(manifest) = self.cache.get(project) {
            debug!("Manifest cache hit for {}", project);
            self.stats.manifest_fetched(project);
            return Ok(manifest);
        }

        let document = tokio::time::timeout(self.timeout, self.source.fetch_document(project))
            .await
            .map_err(|_| {
                warn!("Timed out fetching manifest for {}", project);
                ManifestError::Timeout
            })?
            .inspect_err(|e| warn!("Failed to fetch manifest for {}: {}", project, e))?;

        let manifest = Arc::new(parse_package_json(project.clone(), &document, Utc::now())?);

        let previous = self.cache.insert(project.clone(), manifest.clone());
        let changed = previous.is_none_or(|previous| !previous.same_dependencies(&manifest));
        if changed {
            info!(
                "Manifest updated for {}: {} dependencies",
                project,
                manifest.dependencies.len()
            );
            self.stats.manifest_updated(project);
        }
        self.stats.manifest_fetched(project);

        Ok(manifest)
    }
}

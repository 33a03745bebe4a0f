//! Resolves every dependency of a manifest against the registry

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::{Lookup, TtlCache};
use crate::freshness::report::{DependencyState, DependencyStatus, FreshnessReport};
use crate::manifest::Manifest;
use crate::stats::Stats;
use crate::version::error::RegistryError;
use crate::version::matcher::VersionMatcher;
use crate::version::registry::Registry;

/// Fans registry lookups out for a manifest and assembles a [`FreshnessReport`]
///
/// Lookups share one semaphore, so at most `concurrency` registry requests are
/// outstanding across all passes. Latest versions are cached per package name;
/// when a fresh lookup returns a different version than the one cached before, a
/// "package updated" event is recorded.
pub struct FreshnessResolver {
    registry: Arc<dyn Registry>,
    matcher: Arc<dyn VersionMatcher>,
    stats: Arc<Stats>,
    latest_versions: TtlCache<String, String>,
    permits: Semaphore,
    timeout: Duration,
}

impl FreshnessResolver {
    pub fn new(
        registry: Arc<dyn Registry>,
        matcher: Arc<dyn VersionMatcher>,
        stats: Arc<Stats>,
        package_ttl: Duration,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            matcher,
            stats,
            latest_versions: TtlCache::new(package_ttl),
            permits: Semaphore::new(concurrency.max(1)),
            timeout,
        }
    }

    /// Bound the latest-version cache to `max_entries` packages
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.latest_versions =
            TtlCache::with_max_entries(self.latest_versions.ttl(), max_entries);
        self
    }

    /// Resolve every declared dependency; never fails as a whole
    ///
    /// Failed lookups degrade to `Unknown`. The output preserves the manifest's
    /// declaration order whatever order the lookups complete in.
    pub async fn resolve(&self, manifest: Arc<Manifest>) -> FreshnessReport {
        debug!(
            "Resolving {} dependencies for {}",
            manifest.dependencies.len(),
            manifest.source
        );

        let lookups = manifest
            .dependencies
            .iter()
            .map(|(name, constraint)| self.resolve_dependency(name, constraint));

        // join_all yields results positionally, not in completion order
        let deps = join_all(lookups).await;

        let report = FreshnessReport::new(manifest, deps);
        info!(
            "Resolved {}: {} deps, {} out of date, {} unknown",
            report.project, report.total_deps, report.total_out_of_date, report.total_unknown
        );
        report
    }

    async fn resolve_dependency(&self, name: &str, constraint: &str) -> DependencyStatus {
        let (latest_known_version, state) = match self.latest_version(name).await {
            Ok(latest) => {
                let result = self.matcher.compare_to_latest(constraint, &latest);
                (Some(latest), DependencyState::from(result))
            }
            Err(e) => {
                warn!("Failed to look up {}: {}", name, e);
                (None, DependencyState::Unknown)
            }
        };

        DependencyStatus {
            name: name.to_string(),
            declared_constraint: constraint.to_string(),
            latest_known_version,
            state,
        }
    }

    async fn latest_version(&self, name: &str) -> Result<String, RegistryError> {
        let key = name.to_string();
        if let Lookup::Fresh(latest) = self.latest_versions.get(&key) {
            return Ok(latest);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| RegistryError::LookupFailed(format!("Semaphore error: {}", e)))?;

        let latest = tokio::time::timeout(self.timeout, self.registry.latest_version(name))
            .await
            .map_err(|_| RegistryError::Timeout)??;

        let previous = self.latest_versions.insert(key, latest.clone());
        if let Some(previous) = previous
            && previous != latest
        {
            info!("Package {} updated: {} -> {}", name, previous, latest);
            self.stats.package_updated(name, &latest);
        }

        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::report::{Verdict, classify};
    use crate::manifest::{DependencyMap, ProjectIdentity};
    use crate::version::matchers::NpmVersionMatcher;
    use crate::version::registry::MockRegistry;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manifest(deps: &[(&str, &str)]) -> Arc<Manifest> {
        Arc::new(Manifest {
            source: ProjectIdentity::new("octo", "cat"),
            name: None,
            version: None,
            description: None,
            dependencies: deps
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect::<DependencyMap>(),
            dev_dependencies: DependencyMap::new(),
            fetched_at: Utc::now(),
        })
    }

    fn resolver_with(
        registry: impl Registry + 'static,
        package_ttl: Duration,
    ) -> (FreshnessResolver, Arc<Stats>) {
        let stats = Arc::new(Stats::new(10));
        let resolver = FreshnessResolver::new(
            Arc::new(registry),
            Arc::new(NpmVersionMatcher),
            stats.clone(),
            package_ttl,
            4,
            Duration::from_millis(200),
        );
        (resolver, stats)
    }

    fn states(report: &FreshnessReport) -> Vec<DependencyState> {
        report.deps.iter().map(|d| d.state).collect()
    }

    #[tokio::test]
    async fn resolve_caret_constraint_within_major_is_up_to_date() {
        let mut registry = MockRegistry::new();
        registry
            .expect_latest_version()
            .withf(|name| name == "left-pad")
            .times(1)
            .returning(|_| Ok("1.3.0".to_string()));
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        let report = resolver.resolve(manifest(&[("left-pad", "^1.0.0")])).await;

        assert_eq!(
            report.deps,
            vec![DependencyStatus {
                name: "left-pad".to_string(),
                declared_constraint: "^1.0.0".to_string(),
                latest_known_version: Some("1.3.0".to_string()),
                state: DependencyState::UpToDate,
            }]
        );
    }

    #[tokio::test]
    async fn resolve_caret_constraint_behind_new_major_is_out_of_date() {
        let mut registry = MockRegistry::new();
        registry
            .expect_latest_version()
            .returning(|_| Ok("2.0.0".to_string()));
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        let report = resolver.resolve(manifest(&[("left-pad", "^1.0.0")])).await;

        assert_eq!(states(&report), vec![DependencyState::OutOfDate]);
        assert_eq!(report.total_out_of_date, 1);
    }

    #[tokio::test]
    async fn resolve_empty_manifest_returns_empty_report() {
        let mut registry = MockRegistry::new();
        registry.expect_latest_version().times(0);
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        let report = resolver.resolve(manifest(&[])).await;

        assert_eq!(report.total_deps, 0);
        assert!(report.deps.is_empty());
    }

    #[tokio::test]
    async fn resolve_degrades_failed_lookups_to_unknown() {
        let mut registry = MockRegistry::new();
        registry
            .expect_latest_version()
            .withf(|name| name == "missing")
            .returning(|name| Err(RegistryError::LookupFailed(format!("{} not found", name))));
        registry
            .expect_latest_version()
            .withf(|name| name == "express")
            .returning(|_| Ok("4.0.0".to_string()));
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        let report = resolver
            .resolve(manifest(&[("missing", "^1.0.0"), ("express", "~4.0.0")]))
            .await;

        assert_eq!(
            states(&report),
            vec![DependencyState::Unknown, DependencyState::UpToDate]
        );
        assert_eq!(report.deps[0].latest_known_version, None);
        assert_eq!(report.total_unknown, 1);
    }

    #[tokio::test]
    async fn resolve_never_marks_parseable_constraints_above_latest_unknown() {
        let mut registry = MockRegistry::new();
        registry
            .expect_latest_version()
            .returning(|_| Ok("1.0.0".to_string()));
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        let report = resolver
            .resolve(manifest(&[("a", "2.0.0"), ("b", "^1.2.0")]))
            .await;

        assert_eq!(
            states(&report),
            vec![DependencyState::OutOfDate, DependencyState::UpToDate]
        );
        assert_eq!(report.total_unknown, 0);
        assert!(!report.is_indeterminate());
        assert_eq!(classify(&report), Verdict::OutOfDate);
    }

    #[tokio::test]
    async fn resolve_marks_unparseable_constraint_unknown() {
        let mut registry = MockRegistry::new();
        registry
            .expect_latest_version()
            .returning(|_| Ok("1.0.0".to_string()));
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        let report = resolver
            .resolve(manifest(&[("a", "git://github.com/a/a.git"), ("b", "latest")]))
            .await;

        assert_eq!(
            states(&report),
            vec![DependencyState::Unknown, DependencyState::Unknown]
        );
        assert!(report.is_indeterminate());
    }

    /// Registry that answers after a per-package delay
    struct DelayedRegistry {
        delays: HashMap<String, u64>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Registry for DelayedRegistry {
        async fn latest_version(&self, package_name: &str) -> Result<String, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delays.get(package_name).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok("1.0.0".to_string())
        }
    }

    #[tokio::test]
    async fn resolve_preserves_manifest_order_regardless_of_completion_order() {
        let names = ["a", "b", "c", "d", "e"];
        for delays in [[50, 40, 30, 20, 10], [10, 50, 20, 40, 30]] {
            let registry = DelayedRegistry {
                delays: names
                    .iter()
                    .zip(delays)
                    .map(|(n, d)| (n.to_string(), d))
                    .collect(),
                calls: AtomicUsize::new(0),
            };
            let (resolver, _) = resolver_with(registry, Duration::from_secs(60));
            let deps: Vec<_> = names.iter().map(|n| (*n, "^1.0.0")).collect();

            let report = resolver.resolve(manifest(&deps)).await;

            let resolved: Vec<_> = report.deps.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(resolved, names);
        }
    }

    #[tokio::test]
    async fn resolve_treats_timeout_as_unknown() {
        let registry = DelayedRegistry {
            delays: HashMap::from([("slow".to_string(), 5_000)]),
            calls: AtomicUsize::new(0),
        };
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        let report = resolver
            .resolve(manifest(&[("fast", "^1.0.0"), ("slow", "^1.0.0")]))
            .await;

        assert_eq!(report.total_deps, 2);
        assert_eq!(
            states(&report),
            vec![DependencyState::UpToDate, DependencyState::Unknown]
        );
        assert!(report.total_unknown >= 1);
    }

    /// Registry that tracks the highest number of concurrent lookups
    struct ConcurrencyTracker {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Registry for ConcurrencyTracker {
        async fn latest_version(&self, _package_name: &str) -> Result<String, RegistryError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok("1.0.0".to_string())
        }
    }

    #[tokio::test]
    async fn resolve_bounds_concurrent_lookups() {
        let tracker = Arc::new(ConcurrencyTracker {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let resolver = FreshnessResolver::new(
            tracker.clone(),
            Arc::new(NpmVersionMatcher),
            Arc::new(Stats::new(10)),
            Duration::from_secs(60),
            2,
            Duration::from_secs(5),
        );
        let names: Vec<String> = (0..10).map(|i| format!("pkg-{}", i)).collect();
        let deps: Vec<_> = names.iter().map(|n| (n.as_str(), "*")).collect();

        let report = resolver.resolve(manifest(&deps)).await;

        assert_eq!(report.total_deps, 10);
        assert!(tracker.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn latest_versions_are_cached_between_passes() {
        let mut registry = MockRegistry::new();
        registry
            .expect_latest_version()
            .times(1)
            .returning(|_| Ok("1.0.0".to_string()));
        let (resolver, _) = resolver_with(registry, Duration::from_secs(60));

        resolver.resolve(manifest(&[("a", "^1.0.0")])).await;
        let report = resolver.resolve(manifest(&[("a", "^1.0.0")])).await;

        assert_eq!(states(&report), vec![DependencyState::UpToDate]);
    }

    #[tokio::test]
    async fn changed_latest_version_records_package_update() {
        let mut registry = MockRegistry::new();
        let mut seq = mockall::Sequence::new();
        registry
            .expect_latest_version()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok("1.0.0".to_string()));
        registry
            .expect_latest_version()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("2.0.0".to_string()));
        let (resolver, stats) = resolver_with(registry, Duration::ZERO);

        resolver.resolve(manifest(&[("a", "^1.0.0")])).await;
        resolver.resolve(manifest(&[("a", "^1.0.0")])).await;
        assert!(stats.recently_updated_packages().is_empty());

        let report = resolver.resolve(manifest(&[("a", "^1.0.0")])).await;

        assert_eq!(states(&report), vec![DependencyState::OutOfDate]);
        let updates = stats.recently_updated_packages();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].subject.name, "a");
        assert_eq!(updates[0].subject.version, "2.0.0");
    }
}

//! Process-wide bounded history of recent manifest and package events
//!
//! Three rings are kept, each most-recent-first with a fixed capacity:
//! manifests fetched, manifests whose dependencies changed, and packages that
//! published a new latest version. Readers get a snapshot by value.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DEFAULT_STATS_CAPACITY;
use crate::manifest::ProjectIdentity;

/// A single recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsEntry<T> {
    pub subject: T,
    pub at: DateTime<Utc>,
}

/// A package whose latest published version changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageUpdate {
    pub name: String,
    pub version: String,
}

/// Fixed-capacity, most-recent-first event history
pub struct StatsRing<T> {
    entries: Mutex<VecDeque<StatsEntry<T>>>,
    capacity: usize,
}

impl<T: Clone> StatsRing<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, VecDeque<StatsEntry<T>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append at the front and evict the oldest entries beyond capacity
    pub fn record(&self, subject: T, at: DateTime<Utc>) {
        let mut entries = self.lock_entries();
        entries.push_front(StatsEntry { subject, at });
        entries.truncate(self.capacity);
    }

    pub fn snapshot(&self) -> Vec<StatsEntry<T>> {
        self.lock_entries().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }
}

/// Stats store shared by the manifest fetcher and the freshness resolver
pub struct Stats {
    fetched_manifests: StatsRing<ProjectIdentity>,
    updated_manifests: StatsRing<ProjectIdentity>,
    updated_packages: StatsRing<PackageUpdate>,
}

/// Snapshot of all three rings, suitable for a stats page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub recently_fetched_manifests: Vec<StatsEntry<ProjectIdentity>>,
    pub recently_updated_manifests: Vec<StatsEntry<ProjectIdentity>>,
    pub recently_updated_packages: Vec<StatsEntry<PackageUpdate>>,
}

impl Stats {
    pub fn new(capacity: usize) -> Self {
        Self {
            fetched_manifests: StatsRing::new(capacity),
            updated_manifests: StatsRing::new(capacity),
            updated_packages: StatsRing::new(capacity),
        }
    }

    pub fn manifest_fetched(&self, project: &ProjectIdentity) {
        self.fetched_manifests.record(project.clone(), Utc::now());
    }

    pub fn manifest_updated(&self, project: &ProjectIdentity) {
        self.updated_manifests.record(project.clone(), Utc::now());
    }

    pub fn package_updated(&self, name: &str, version: &str) {
        self.updated_packages.record(
            PackageUpdate {
                name: name.to_string(),
                version: version.to_string(),
            },
            Utc::now(),
        );
    }

    pub fn recently_fetched_manifests(&self) -> Vec<StatsEntry<ProjectIdentity>> {
        self.fetched_manifests.snapshot()
    }

    pub fn recently_updated_manifests(&self) -> Vec<StatsEntry<ProjectIdentity>> {
        self.updated_manifests.snapshot()
    }

    pub fn recently_updated_packages(&self) -> Vec<StatsEntry<PackageUpdate>> {
        self.updated_packages.snapshot()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            recently_fetched_manifests: self.recently_fetched_manifests(),
            recently_updated_manifests: self.recently_updated_manifests(),
            recently_updated_packages: self.recently_updated_packages(),
        }
    }

    /// Empty every ring. Only meant for tests.
    pub fn reset(&self) {
        self.fetched_manifests.clear();
        self.updated_manifests.clear();
        self.updated_packages.clear();
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(DEFAULT_STATS_CAPACITY)
    }
}

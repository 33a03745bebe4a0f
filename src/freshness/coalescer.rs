//! Report cache with request coalescing and stale-while-revalidate
//!
//! At most one manifest fetch + resolution pipeline runs per project at any time.
//! Callers arriving while it is in flight share its result. Pipelines run as
//! spawned tasks, so a caller giving up does not cancel work other callers wait
//! on; only [`ReportCoalescer::shutdown`] aborts them. The report cache is
//! written only after a pipeline succeeds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::cache::{Lookup, TtlCache};
use crate::freshness::report::FreshnessReport;
use crate::freshness::resolver::FreshnessResolver;
use crate::manifest::{ManifestError, ManifestFetcher, ProjectIdentity};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Report resolution was cancelled")]
    Cancelled,
}

/// Per-request options for [`ReportCoalescer::get_report`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Return an expired report immediately while a refresh runs in the background
    pub allow_stale: bool,
}

impl ReportOptions {
    pub fn allow_stale() -> Self {
        Self { allow_stale: true }
    }
}

type ReportResult = Result<Arc<FreshnessReport>, ReportError>;
type SharedReport = Shared<BoxFuture<'static, ReportResult>>;

/// Manifest fetch followed by a resolution pass
pub struct Pipeline {
    fetcher: ManifestFetcher,
    resolver: FreshnessResolver,
}

impl Pipeline {
    pub fn new(fetcher: ManifestFetcher, resolver: FreshnessResolver) -> Self {
        Self { fetcher, resolver }
    }

    pub async fn run(&self, project: &ProjectIdentity) -> Result<FreshnessReport, ManifestError> {
        let manifest = self.fetcher.get_manifest(project).await?;
        Ok(self.resolver.resolve(manifest).await)
    }
}

struct InFlight {
    id: u64,
    result: SharedReport,
    abort: AbortHandle,
}

#[derive(Default)]
struct State {
    in_flight: HashMap<ProjectIdentity, InFlight>,
    next_id: u64,
    closed: bool,
}

/// Outcome of checking the cache and the in-flight map under one lock
enum Claim {
    Fresh(Arc<FreshnessReport>),
    Pending {
        stale: Option<Arc<FreshnessReport>>,
        /// `None` once the coalescer is shut down
        result: Option<SharedReport>,
    },
}

pub struct ReportCoalescer {
    pipeline: Arc<Pipeline>,
    reports: Arc<TtlCache<ProjectIdentity, Arc<FreshnessReport>>>,
    state: Arc<Mutex<State>>,
}

impl ReportCoalescer {
    pub fn new(pipeline: Pipeline, report_ttl: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            reports: Arc::new(TtlCache::new(report_ttl)),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Bound the report cache to `max_entries` projects
    pub fn with_max_entries(self, max_entries: usize) -> Self {
        Self {
            reports: Arc::new(TtlCache::with_max_entries(self.reports.ttl(), max_entries)),
            ..self
        }
    }

    /// Get the report for `project`
    ///
    /// - fresh cached report: returned with no network activity
    /// - expired report and `allow_stale`: returned immediately, refresh started
    /// - otherwise: waits for the (possibly shared) in-flight resolution
    ///
    /// Manifest failures are returned identically to every waiter.
    pub async fn get_report(
        &self,
        project: &ProjectIdentity,
        options: ReportOptions,
    ) -> ReportResult {
        match self.claim(project) {
            Claim::Fresh(report) => {
                debug!("Report cache hit for {}", project);
                Ok(report)
            }
            Claim::Pending {
                stale: Some(report),
                ..
            } if options.allow_stale => {
                debug!("Serving stale report for {} while refreshing", project);
                Ok(report)
            }
            Claim::Pending {
                result: Some(result),
                ..
            } => result.await,
            Claim::Pending { result: None, .. } => Err(ReportError::Cancelled),
        }
    }

    /// Abort every in-flight pipeline and refuse to start new ones
    ///
    /// Cached reports are left untouched.
    pub fn shutdown(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        let count = state.in_flight.len();
        for (_, in_flight) in state.in_flight.drain() {
            in_flight.abort.abort();
        }
        info!("Report coalescer shut down, {} refreshes cancelled", count);
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.state).in_flight.len()
    }

    /// Cached report regardless of expiry, without triggering a refresh
    pub fn cached(&self, project: &ProjectIdentity) -> Option<Arc<FreshnessReport>> {
        self.reports.get(project).any()
    }

    /// Check-for-in-flight and register-as-in-flight happen under a single lock
    fn claim(&self, project: &ProjectIdentity) -> Claim {
        let mut state = lock(&self.state);

        let stale = match self.reports.get(project) {
            Lookup::Fresh(report) => return Claim::Fresh(report),
            Lookup::Stale(report) => Some(report),
            Lookup::Missing => None,
        };

        if state.closed {
            return Claim::Pending {
                stale,
                result: None,
            };
        }

        if let Some(in_flight) = state.in_flight.get(project) {
            debug!("Joining in-flight resolution for {}", project);
            return Claim::Pending {
                stale,
                result: Some(in_flight.result.clone()),
            };
        }

        let id = state.next_id;
        state.next_id += 1;
        let in_flight = self.start(project.clone(), id);
        let result = in_flight.result.clone();
        state.in_flight.insert(project.clone(), in_flight);

        Claim::Pending {
            stale,
            result: Some(result),
        }
    }

    fn start(&self, project: ProjectIdentity, id: u64) -> InFlight {
        debug!("Starting resolution for {}", project);

        let pipeline = self.pipeline.clone();
        let reports = self.reports.clone();
        let state = self.state.clone();

        let task = tokio::spawn(async move {
            let result = pipeline.run(&project).await.map(Arc::new);

            // The spawner holds this lock until the entry is registered, so the
            // entry removed here is always the one this task belongs to.
            let mut state = lock(&state);
            match &result {
                Ok(report) => {
                    reports.insert(project.clone(), report.clone());
                }
                Err(e) => warn!("Resolution failed for {}: {}", project, e),
            }
            if state.in_flight.get(&project).is_some_and(|f| f.id == id) {
                state.in_flight.remove(&project);
            }

            result.map_err(ReportError::from)
        });

        let abort = task.abort_handle();
        let result = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    if !e.is_cancelled() {
                        warn!("Resolution task failed: {}", e);
                    }
                    Err(ReportError::Cancelled)
                }
            }
        }
        .boxed()
        .shared();

        InFlight { id, result, abort }
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

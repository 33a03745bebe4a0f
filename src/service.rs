//! Facade a routing layer drives: report, status page data, badge verdict and stats
//!
//! The service never writes a response itself. Failed operations are handed to an
//! [`ErrorReporter`] together with the request context and a message suitable for
//! showing to the user, and the error is returned to the caller.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::freshness::{
    FreshnessReport, FreshnessResolver, Pipeline, ReportCoalescer, ReportError, ReportOptions,
    Verdict, classify,
};
use crate::manifest::{GitHubManifestSource, ManifestFetcher, ManifestSource, ProjectIdentity};
use crate::stats::{Stats, StatsSnapshot};
use crate::version::matchers::NpmVersionMatcher;
use crate::version::registries::NpmRegistry;
use crate::version::registry::Registry;

/// Which facade operation a request went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Report,
    Status,
    Badge,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Report => "report",
            Operation::Status => "status",
            Operation::Badge => "badge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub project: ProjectIdentity,
    pub operation: Operation,
}

/// Receives every failed core operation
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &ReportError, context: &RequestContext, user_message: &str);
}

/// Logs failures through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &ReportError, context: &RequestContext, user_message: &str) {
        error!(
            project = %context.project,
            operation = %context.operation,
            "{}: {}",
            user_message,
            error
        );
    }
}

/// Report plus the verdict derived from it, as rendered on a status page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub report: Arc<FreshnessReport>,
    pub verdict: Verdict,
}

pub struct FreshnessService {
    coalescer: ReportCoalescer,
    stats: Arc<Stats>,
    reporter: Arc<dyn ErrorReporter>,
}

impl FreshnessService {
    /// Build a service talking to the upstreams named in `config`
    pub fn new(config: &Config) -> Self {
        let upstream = &config.upstream;
        let source = GitHubManifestSource::new(
            &upstream.manifest_base_url,
            &upstream.manifest_ref,
            &upstream.manifest_path,
        );
        let registry = NpmRegistry::new(&upstream.registry_base_url);

        Self::with_components(
            config,
            Arc::new(source),
            Arc::new(registry),
            Arc::new(TracingErrorReporter),
        )
    }

    /// Build a service with custom collaborators
    pub fn with_components(
        config: &Config,
        source: Arc<dyn ManifestSource>,
        registry: Arc<dyn Registry>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let stats = Arc::new(Stats::new(config.stats.capacity));
        let timeout = config.fetch.timeout();
        let max_entries = config.cache.max_entries;

        let fetcher = ManifestFetcher::new(
            source,
            stats.clone(),
            config.cache.manifest_ttl(),
            timeout,
        )
        .with_max_entries(max_entries);
        let resolver = FreshnessResolver::new(
            registry,
            Arc::new(NpmVersionMatcher),
            stats.clone(),
            config.cache.package_ttl(),
            config.fetch.concurrency,
            timeout,
        )
        .with_max_entries(max_entries);
        let coalescer =
            ReportCoalescer::new(Pipeline::new(fetcher, resolver), config.cache.report_ttl())
                .with_max_entries(max_entries);

        info!(
            "Freshness service ready (report ttl {:?}, concurrency {})",
            config.cache.report_ttl(),
            config.fetch.concurrency
        );

        Self {
            coalescer,
            stats,
            reporter,
        }
    }

    pub async fn report(
        &self,
        project: &ProjectIdentity,
        options: ReportOptions,
    ) -> Result<Arc<FreshnessReport>, ReportError> {
        self.coalescer
            .get_report(project, options)
            .await
            .inspect_err(|e| {
                self.fail(e, project, Operation::Report, "Failed to get dependency report")
            })
    }

    /// Report and verdict for a status page; always reflects a fresh report
    pub async fn status(&self, project: &ProjectIdentity) -> Result<ProjectStatus, ReportError> {
        let report = self
            .coalescer
            .get_report(project, ReportOptions::default())
            .await
            .inspect_err(|e| {
                self.fail(e, project, Operation::Status, "Failed to get dependency status")
            })?;

        Ok(ProjectStatus {
            verdict: classify(&report),
            report,
        })
    }

    /// Badge verdict; serves stale reports and never fails
    ///
    /// Any failure is reported and shown as `Indeterminate`, since a badge embedded
    /// in a third-party page must always render.
    pub async fn badge(&self, project: &ProjectIdentity) -> Verdict {
        match self
            .coalescer
            .get_report(project, ReportOptions::allow_stale())
            .await
        {
            Ok(report) => classify(&report),
            Err(e) => {
                self.fail(&e, project, Operation::Badge, "Failed to get dependency badge");
                Verdict::Indeterminate
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Cancel in-flight background refreshes; cached reports stay available
    pub fn shutdown(&self) {
        self.coalescer.shutdown();
    }

    fn fail(
        &self,
        error: &ReportError,
        project: &ProjectIdentity,
        operation: Operation,
        user_message: &str,
    ) {
        let context = RequestContext {
            project: project.clone(),
            operation,
        };
        self.reporter.report(error, &context, user_message);
    }
}

//! Freshness report model and verdict classification

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::manifest::{Manifest, ProjectIdentity};
use crate::version::semver::CompareResult;

/// Share of out-of-date dependencies above which a project is `OutOfDate`
pub const OUT_OF_DATE_THRESHOLD: f64 = 0.25;

/// Freshness of a single dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyState {
    UpToDate,
    OutOfDate,
    /// Registry lookup failed or a version could not be parsed
    Unknown,
}

impl From<CompareResult> for DependencyState {
    fn from(result: CompareResult) -> Self {
        match result {
            // Out of date only once the latest release has moved past the range
            CompareResult::Latest | CompareResult::Newer => DependencyState::UpToDate,
            CompareResult::Outdated => DependencyState::OutOfDate,
            CompareResult::Invalid => DependencyState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatus {
    pub name: String,
    pub declared_constraint: String,
    /// `None` when the registry lookup failed
    pub latest_known_version: Option<String>,
    pub state: DependencyState,
}

/// Result of one resolution pass over a manifest
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessReport {
    pub project: ProjectIdentity,
    pub manifest: Arc<Manifest>,
    /// In manifest declaration order
    pub deps: Vec<DependencyStatus>,
    pub total_deps: usize,
    pub total_out_of_date: usize,
    pub total_unknown: usize,
    pub computed_at: DateTime<Utc>,
}

impl FreshnessReport {
    /// Build a report, deriving every total from `deps`
    pub fn new(manifest: Arc<Manifest>, deps: Vec<DependencyStatus>) -> Self {
        let count = |state| deps.iter().filter(|d| d.state == state).count();
        let total_out_of_date = count(DependencyState::OutOfDate);
        let total_unknown = count(DependencyState::Unknown);

        Self {
            project: manifest.source.clone(),
            total_deps: deps.len(),
            total_out_of_date,
            total_unknown,
            deps,
            manifest,
            computed_at: Utc::now(),
        }
    }

    pub fn total_up_to_date(&self) -> usize {
        self.total_deps - self.total_out_of_date - self.total_unknown
    }

    /// Every dependency is `Unknown`, so nothing can be claimed about the project
    pub fn is_indeterminate(&self) -> bool {
        self.total_deps > 0 && self.total_unknown == self.total_deps
    }
}

/// Overall freshness of a project, as shown on its badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    UpToDate,
    MostlyUpToDate,
    OutOfDate,
    Indeterminate,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::UpToDate => "up to date",
            Verdict::MostlyUpToDate => "mostly up to date",
            Verdict::OutOfDate => "out of date",
            Verdict::Indeterminate => "unknown",
        }
    }

    /// Badge image served for this verdict
    pub fn badge_name(&self) -> &'static str {
        match self {
            Verdict::UpToDate => "uptodate.png",
            Verdict::MostlyUpToDate => "notsouptodate.png",
            Verdict::OutOfDate => "outofdate.png",
            Verdict::Indeterminate => "unknown.png",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a report for presentation
///
/// - no dependencies, or none out of date: `UpToDate`
/// - every dependency unknown: `Indeterminate`
/// - more than 25% out of date: `OutOfDate`
/// - otherwise: `MostlyUpToDate`
pub fn classify(report: &FreshnessReport) -> Verdict {
    if report.total_deps == 0 {
        return Verdict::UpToDate;
    }
    if report.is_indeterminate() {
        return Verdict::Indeterminate;
    }
    if report.total_out_of_date == 0 {
        return Verdict::UpToDate;
    }

    let ratio = report.total_out_of_date as f64 / report.total_deps as f64;
    if ratio > OUT_OF_DATE_THRESHOLD {
        Verdict::OutOfDate
    } else {
        Verdict::MostlyUpToDate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DependencyMap;
    use rstest::rstest;

    fn manifest() -> Arc<Manifest> {
        Arc::new(Manifest {
            source: ProjectIdentity::new("octo", "cat"),
            name: None,
            version: None,
            description: None,
            dependencies: DependencyMap::new(),
            dev_dependencies: DependencyMap::new(),
            fetched_at: Utc::now(),
        })
    }

    fn report(up_to_date: usize, out_of_date: usize, unknown: usize) -> FreshnessReport {
        let states = std::iter::repeat_n(DependencyState::UpToDate, up_to_date)
            .chain(std::iter::repeat_n(DependencyState::OutOfDate, out_of_date))
            .chain(std::iter::repeat_n(DependencyState::Unknown, unknown));
        let deps = states
            .enumerate()
            .map(|(i, state)| DependencyStatus {
                name: format!("dep-{}", i),
                declared_constraint: "^1.0.0".to_string(),
                latest_known_version: Some("1.0.0".to_string()),
                state,
            })
            .collect();
        FreshnessReport::new(manifest(), deps)
    }

    #[test]
    fn new_derives_totals_from_deps() {
        let report = report(2, 3, 1);

        assert_eq!(report.total_deps, 6);
        assert_eq!(report.total_deps, report.deps.len());
        assert_eq!(report.total_out_of_date, 3);
        assert_eq!(report.total_unknown, 1);
        assert_eq!(report.total_up_to_date(), 2);
        assert_eq!(report.project, ProjectIdentity::new("octo", "cat"));
    }

    #[rstest]
    #[case(0, 0, 0, Verdict::UpToDate)]
    #[case(3, 0, 0, Verdict::UpToDate)]
    #[case(3, 0, 1, Verdict::UpToDate)]
    #[case(3, 1, 0, Verdict::MostlyUpToDate)] // exactly 25%
    #[case(3, 2, 0, Verdict::OutOfDate)] // 40%
    #[case(1, 1, 2, Verdict::MostlyUpToDate)]
    #[case(0, 1, 0, Verdict::OutOfDate)]
    #[case(0, 0, 3, Verdict::Indeterminate)]
    #[case(0, 1, 3, Verdict::MostlyUpToDate)]
    fn classify_returns_expected(
        #[case] up_to_date: usize,
        #[case] out_of_date: usize,
        #[case] unknown: usize,
        #[case] expected: Verdict,
    ) {
        assert_eq!(classify(&report(up_to_date, out_of_date, unknown)), expected);
    }

    #[rstest]
    #[case(CompareResult::Latest, DependencyState::UpToDate)]
    #[case(CompareResult::Outdated, DependencyState::OutOfDate)]
    #[case(CompareResult::Newer, DependencyState::UpToDate)]
    #[case(CompareResult::Invalid, DependencyState::Unknown)]
    fn dependency_state_from_compare_result(
        #[case] result: CompareResult,
        #[case] expected: DependencyState,
    ) {
        assert_eq!(DependencyState::from(result), expected);
    }

    #[test]
    fn indeterminate_badge_differs_from_up_to_date() {
        assert_ne!(
            Verdict::Indeterminate.badge_name(),
            Verdict::UpToDate.badge_name()
        );
    }
}

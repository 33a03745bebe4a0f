//! Freshness resolution
//!
//! - `resolver`: looks up the latest version of every dependency of a manifest
//! - `report`: the resulting report and its verdict
//! - `coalescer`: report cache, in-flight request sharing and background refresh

pub mod coalescer;
pub mod report;
pub mod resolver;

pub use coalescer::{Pipeline, ReportCoalescer, ReportError, ReportOptions};
pub use report::{
    DependencyState, DependencyStatus, FreshnessReport, OUT_OF_DATE_THRESHOLD, Verdict, classify,
};
pub use resolver::FreshnessResolver;

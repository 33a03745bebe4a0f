//! Version layer: registry lookups and constraint comparison
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐                         ┌─────────────┐
//! │  Registry   │                         │   Matcher   │
//! │  (lookup)   │                         │(version cmp)│
//! └─────────────┘                         └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │ Registries  │                         │  Matchers   │
//! │    (npm)    │                         │    (npm)    │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for looking up the latest published version
//! - [`registries`]: Concrete registry implementations
//! - [`matcher`]: Constraint matching trait
//! - [`matchers`]: Concrete matchers (npm range grammar)
//! - [`semver`]: Shared semver utilities and `CompareResult`
//! - [`error`]: Registry error type

pub mod error;
pub mod matcher;
pub mod matchers;
pub mod registries;
pub mod registry;
pub mod semver;

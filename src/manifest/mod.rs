//! Manifest layer: project identity, package.json parsing and cached retrieval
//!
//! # Modules
//!
//! - [`types`]: `ProjectIdentity` and `Manifest`
//! - [`parser`]: package.json document parsing
//! - [`source`]: Manifest hosting service clients
//! - [`fetcher`]: Cached manifest retrieval with stats recording
//! - [`error`]: Manifest error type

pub mod error;
pub mod fetcher;
pub mod parser;
pub mod source;
pub mod types;

pub use error::ManifestError;
pub use fetcher::ManifestFetcher;
pub use source::{GitHubManifestSource, ManifestSource};
pub use types::{DependencyMap, Manifest, ProjectIdentity, ProjectParseError};

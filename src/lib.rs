//! Dependency freshness resolution engine
//!
//! Retrieves a project's dependency manifest from its hosting service, resolves every
//! declared dependency against the latest published version in the package registry,
//! and classifies the project's overall freshness for badges and status pages.
//!
//! # Modules
//!
//! - [`manifest`]: Project identity, manifest parsing and the cached manifest fetcher
//! - [`version`]: Registry client and version range comparison
//! - [`freshness`]: Freshness resolver, report model, verdict classifier and coalescer
//! - [`stats`]: Bounded history of recent manifest and package events
//! - [`service`]: Facade wiring everything together for a routing layer
//! - [`config`]: Configuration and defaults

pub mod cache;
pub mod config;
pub mod freshness;
pub mod logging;
pub mod manifest;
pub mod service;
pub mod stats;
pub mod version;

//! Shared helpers for end-to-end tests

mod upstream;

pub use upstream::{Upstream, manifest_body};

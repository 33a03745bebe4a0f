//! Registry implementations for looking up latest package versions

pub mod npm;

pub use npm::NpmRegistry;

//! Version matching abstraction for different registries

use crate::version::semver::CompareResult;

/// Trait for registry-specific constraint matching logic
///
/// Each ecosystem spells version constraints differently; npm uses range
/// specifications such as `^1.0.0`, `~1.0.0` or `>=1.0.0 <2.0.0`.
pub trait VersionMatcher: Send + Sync {
    /// Compare a declared constraint with the latest published version
    ///
    /// For npm: `^1.0.0` against `1.9.9` is `Latest`, against `2.0.0` is `Outdated`.
    /// Unparseable input on either side is `Invalid`, never a guessed verdict.
    fn compare_to_latest(&self, constraint: &str, latest_version: &str) -> CompareResult;
}

//! npm version matcher
//!
//! A declared constraint is parsed into a union of version intervals:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact pin
//! - `1`, `1.2`, `1.x`, `1.2.x`, `*`, `""` - wildcards (`1.2` means `>=1.2.0 <1.3.0`)
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0, tighter for 0.x)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.0.0 - 2.0.0` - hyphen range (inclusive)
//! - `>=1.0.0 <2.0.0` - intersection (space separated)
//! - `^1.0.0 || ^2.0.0` - union
//!
//! Anything else (dist-tags such as `latest`, git or file URLs) does not parse.
//!
//! As in npm, a prerelease version only satisfies an interval built from a comparator
//! carrying a prerelease on the same `major.minor.patch`: `^1.0.0` does not accept
//! `1.1.0-rc.1`, while `^1.1.0-rc.0` does.

use std::ops::Bound;

use semver::{Prerelease, Version};

use crate::version::matcher::VersionMatcher;
use crate::version::semver::{CompareResult, parse_published};

pub struct NpmVersionMatcher;

impl VersionMatcher for NpmVersionMatcher {
    fn compare_to_latest(&self, constraint: &str, latest_version: &str) -> CompareResult {
        let Some(constraint) = Constraint::parse(constraint) else {
            return CompareResult::Invalid;
        };

        let Some(latest) = parse_published(latest_version) else {
            return CompareResult::Invalid;
        };

        if constraint.satisfies(&latest) {
            CompareResult::Latest
        } else if constraint.is_below(&latest) || constraint.is_exact_pin() {
            // A pin is satisfied only by that exact version
            CompareResult::Outdated
        } else {
            CompareResult::Newer
        }
    }
}

/// Union of intervals; satisfied when any interval contains the version
#[derive(Debug, Clone, PartialEq)]
struct Constraint(Vec<Interval>);

impl Constraint {
    fn parse(spec: &str) -> Option<Self> {
        spec.split("||")
            .map(Interval::parse_set)
            .collect::<Option<Vec<_>>>()
            .map(Constraint)
    }

    fn satisfies(&self, version: &Version) -> bool {
        self.0.iter().any(|interval| interval.contains(version))
    }

    /// Every allowed version is lower than `version`
    fn is_below(&self, version: &Version) -> bool {
        self.0.iter().all(|interval| interval.is_below(version))
    }

    fn is_exact_pin(&self) -> bool {
        match self.0.as_slice() {
            [Interval {
                lower: Bound::Included(lower),
                upper: Bound::Included(upper),
                ..
            }] => lower == upper,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Interval {
    lower: Bound<Version>,
    upper: Bound<Version>,
    /// `major.minor.patch` of comparators that carry a prerelease
    prerelease_tuples: Vec<(u64, u64, u64)>,
}

impl Interval {
    const UNBOUNDED: Interval = Interval {
        lower: Bound::Unbounded,
        upper: Bound::Unbounded,
        prerelease_tuples: Vec::new(),
    };

    fn new(lower: Bound<Version>, upper: Bound<Version>) -> Self {
        Self {
            lower,
            upper,
            prerelease_tuples: Vec::new(),
        }
    }

    /// Allow prereleases of `partial`'s version if it carries one
    fn admitting(mut self, partial: &Partial) -> Self {
        if !partial.pre.is_empty() {
            let floor = partial.floor();
            self.prerelease_tuples
                .push((floor.major, floor.minor, floor.patch));
        }
        self
    }

    /// Parse one `||` alternative: a hyphen range or space separated comparators
    fn parse_set(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Some(Self::UNBOUNDED);
        }

        if let Some((from, to)) = spec.split_once(" - ") {
            return Self::parse_hyphen(from.trim(), to.trim());
        }

        join_operators(spec)
            .into_iter()
            .map(|comparator| Self::parse_comparator(&comparator))
            .try_fold(Self::UNBOUNDED, |acc, next| Some(acc.intersect(next?)))
    }

    fn parse_hyphen(from: &str, to: &str) -> Option<Self> {
        let from = Partial::parse(from)?;
        let to = Partial::parse(to)?;

        let upper = if to.is_any() {
            Bound::Unbounded
        } else if to.is_full() {
            Bound::Included(to.floor())
        } else {
            Bound::Excluded(to.wildcard_ceiling()?)
        };

        Some(
            Self::new(Bound::Included(from.floor()), upper)
                .admitting(&from)
                .admitting(&to),
        )
    }

    fn parse_comparator(comparator: &str) -> Option<Self> {
        const OPERATORS: [&str; 7] = [">=", "<=", ">", "<", "^", "~", "="];

        let (op, rest) = OPERATORS
            .iter()
            .find_map(|op| comparator.strip_prefix(op).map(|rest| (*op, rest)))
            .unwrap_or(("", comparator));
        let partial = Partial::parse(rest.trim())?;

        if partial.is_any() {
            return match op {
                // Nothing is above or below every version
                ">" | "<" => None,
                _ => Some(Self::UNBOUNDED),
            };
        }

        let floor = partial.floor();
        let interval = match op {
            "" | "=" if partial.is_full() => {
                Self::new(Bound::Included(floor.clone()), Bound::Included(floor))
            }
            "" | "=" => Self::new(
                Bound::Included(floor),
                Bound::Excluded(partial.wildcard_ceiling()?),
            ),
            "^" => Self::new(Bound::Included(floor), Bound::Excluded(partial.caret_ceiling())),
            "~" => Self::new(Bound::Included(floor), Bound::Excluded(partial.tilde_ceiling())),
            ">=" => Self::new(Bound::Included(floor), Bound::Unbounded),
            ">" if partial.is_full() => Self::new(Bound::Excluded(floor), Bound::Unbounded),
            // >1.2 means >=1.3.0
            ">" => Self::new(
                Bound::Included(partial.wildcard_ceiling()?),
                Bound::Unbounded,
            ),
            "<" => Self::new(Bound::Unbounded, Bound::Excluded(floor)),
            "<=" if partial.is_full() => Self::new(Bound::Unbounded, Bound::Included(floor)),
            // <=1.2 means <1.3.0
            "<=" => Self::new(
                Bound::Unbounded,
                Bound::Excluded(partial.wildcard_ceiling()?),
            ),
            _ => return None,
        };

        Some(interval.admitting(&partial))
    }

    fn contains(&self, version: &Version) -> bool {
        if !version.pre.is_empty()
            && !self
                .prerelease_tuples
                .contains(&(version.major, version.minor, version.patch))
        {
            return false;
        }

        let above_lower = match &self.lower {
            Bound::Included(v) => version >= v,
            Bound::Excluded(v) => version > v,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(v) => version <= v,
            Bound::Excluded(v) => version < v,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }

    fn is_below(&self, version: &Version) -> bool {
        match &self.upper {
            Bound::Included(v) => version > v,
            Bound::Excluded(v) => version >= v,
            Bound::Unbounded => false,
        }
    }

    fn intersect(self, other: Interval) -> Interval {
        let mut prerelease_tuples = self.prerelease_tuples;
        prerelease_tuples.extend(other.prerelease_tuples);
        Interval {
            lower: tighter(self.lower, other.lower, |a, b| a > b),
            upper: tighter(self.upper, other.upper, |a, b| a < b),
            prerelease_tuples,
        }
    }
}

/// Pick the more restrictive of two bounds; `wins(a, b)` is true when `a` is tighter
fn tighter(
    a: Bound<Version>,
    b: Bound<Version>,
    wins: impl Fn(&Version, &Version) -> bool,
) -> Bound<Version> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (a, b) => {
            let (va, vb) = (bound_version(&a), bound_version(&b));
            if va == vb {
                // Same version: exclusive is tighter
                if matches!(a, Bound::Excluded(_)) { a } else { b }
            } else if wins(va, vb) {
                a
            } else {
                b
            }
        }
    }
}

fn bound_version(bound: &Bound<Version>) -> &Version {
    match bound {
        Bound::Included(v) | Bound::Excluded(v) => v,
        Bound::Unbounded => unreachable!("unbounded handled by caller"),
    }
}

/// Split on whitespace, re-attaching bare operators to the version that follows
/// (`>= 1.2.3` is the same as `>=1.2.3`)
fn join_operators(spec: &str) -> Vec<String> {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in spec.split_whitespace() {
        let is_bare_op = token.chars().all(|c| matches!(c, '>' | '<' | '=' | '^' | '~'));
        match pending_op.take() {
            Some(op) => comparators.push(format!("{}{}", op, token)),
            None if is_bare_op => pending_op = Some(token),
            None => comparators.push(token.to_string()),
        }
    }

    if let Some(op) = pending_op {
        comparators.push(op.to_string());
    }

    comparators
}

/// A possibly incomplete version such as `1`, `1.2`, `1.x` or `*`
#[derive(Debug, Clone, PartialEq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(input: &str) -> Option<Self> {
        let input = input.strip_prefix('v').unwrap_or(input);

        if input.is_empty() {
            return Some(Self::any());
        }

        // Full versions may carry prerelease and build metadata
        if let Ok(version) = Version::parse(input) {
            return Some(Self {
                major: Some(version.major),
                minor: Some(version.minor),
                patch: Some(version.patch),
                pre: version.pre,
            });
        }

        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() > 3 {
            return None;
        }

        let mut numbers = [None; 3];
        let mut seen_wildcard = false;
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if matches!(*part, "x" | "X" | "*") {
                seen_wildcard = true;
            } else if seen_wildcard {
                // 1.x.3 is not a valid pattern
                return None;
            } else {
                *slot = Some(part.parse::<u64>().ok()?);
            }
        }

        Some(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre: Prerelease::EMPTY,
        })
    }

    fn any() -> Self {
        Self {
            major: None,
            minor: None,
            patch: None,
            pre: Prerelease::EMPTY,
        }
    }

    fn is_any(&self) -> bool {
        self.major.is_none()
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }

    /// Lowest version matched, missing components filled with zero
    fn floor(&self) -> Version {
        let mut version = Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        );
        version.pre = self.pre.clone();
        version
    }

    /// Exclusive upper bound of the wildcard: `1` -> `2.0.0`, `1.2` -> `1.3.0`
    fn wildcard_ceiling(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Some(Version::new(major + 1, 0, 0)),
            (Some(major), Some(minor), None) => Some(Version::new(major, minor + 1, 0)),
            _ => None,
        }
    }

    /// Exclusive upper bound of `^`: bump the left-most non-zero component
    fn caret_ceiling(&self) -> Version {
        let major = self.major.unwrap_or(0);
        match (self.minor, self.patch) {
            _ if major > 0 => Version::new(major + 1, 0, 0),
            (None, _) => Version::new(1, 0, 0),
            (Some(minor), _) if minor > 0 => Version::new(0, minor + 1, 0),
            (Some(_), None) => Version::new(0, 1, 0),
            (Some(_), Some(patch)) => Version::new(0, 0, patch + 1),
        }
    }

    /// Exclusive upper bound of `~`: bump minor, or major when minor is missing
    fn tilde_ceiling(&self) -> Version {
        let major = self.major.unwrap_or(0);
        match self.minor {
            Some(minor) => Version::new(major, minor + 1, 0),
            None => Version::new(major + 1, 0, 0),
        }
    }
}

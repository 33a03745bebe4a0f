//! Project identity and manifest types

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

/// Characters GitHub accepts in owner and repository names
static SEGMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid segment regex"));

/// Owner/repository pair identifying a hosted project
///
/// Used as the key for the manifest cache, the report cache and coalescing.
/// Equality is case-sensitive on both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProjectIdentity {
    pub owner: String,
    pub repo: String,
}

impl ProjectIdentity {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for ProjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectParseError {
    #[error("Expected owner/repo, got {0:?}")]
    Format(String),

    #[error("Invalid path segment {0:?}")]
    InvalidSegment(String),
}

impl FromStr for ProjectIdentity {
    type Err = ProjectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((owner, repo)) = s.split_once('/') else {
            return Err(ProjectParseError::Format(s.to_string()));
        };

        for segment in [owner, repo] {
            if segment.is_empty() {
                return Err(ProjectParseError::Format(s.to_string()));
            }
            if segment == "." || segment == ".." || !SEGMENT_PATTERN.is_match(segment) {
                return Err(ProjectParseError::InvalidSegment(segment.to_string()));
            }
        }

        Ok(Self::new(owner, repo))
    }
}

/// Dependency name to declared version constraint, in document order
pub type DependencyMap = IndexMap<String, String>;

/// A project's declared dependencies as retrieved from its hosting service
///
/// Immutable once constructed; a newer fetch supersedes it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub source: ProjectIdentity,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub dependencies: DependencyMap,
    pub dev_dependencies: DependencyMap,
    pub fetched_at: DateTime<Utc>,
}

impl Manifest {
    /// Whether the declared dependencies match, ignoring declaration order and fetch time
    pub fn same_dependencies(&self, other: &Manifest) -> bool {
        // IndexMap equality does not depend on insertion order
        self.dependencies == other.dependencies && self.dev_dependencies == other.dev_dependencies
    }
}

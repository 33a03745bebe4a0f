//! package.json parser

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::manifest::error::ManifestError;
use crate::manifest::types::{DependencyMap, Manifest, ProjectIdentity};

/// The subset of package.json the freshness engine reads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    dependencies: Option<DependencyMap>,
    dev_dependencies: Option<DependencyMap>,
}

/// Parse a package.json document into a [`Manifest`]
///
/// Fails with [`ManifestError::Parse`] when the document is not a JSON object, when
/// the `dependencies` section is missing, or when any dependency value is not a string.
pub fn parse_package_json(
    source: ProjectIdentity,
    content: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Manifest, ManifestError> {
    let document: PackageJson = serde_json::from_str(content).map_err(|e| {
        warn!("Failed to parse manifest for {}: {}", source, e);
        ManifestError::Parse(e.to_string())
    })?;

    let Some(dependencies) = document.dependencies else {
        warn!("Manifest for {} has no dependencies section", source);
        return Err(ManifestError::Parse(
            "missing dependencies section".to_string(),
        ));
    };

    Ok(Manifest {
        source,
        name: document.name,
        version: document.version,
        description: document.description,
        dependencies,
        dev_dependencies: document.dev_dependencies.unwrap_or_default(),
        fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Manifest, ManifestError> {
        parse_package_json(ProjectIdentity::new("octo", "cat"), content, Utc::now())
    }

    #[test]
    fn parse_extracts_dependencies_in_document_order() {
        let manifest = parse(
            r#"{
                "name": "my-app",
                "version": "1.0.0",
                "dependencies": {
                    "zlib": "^1.0.0",
                    "express": "~3.0.0",
                    "async": "0.2.x"
                },
                "devDependencies": {
                    "mocha": "*"
                }
            }"#,
        )
        .unwrap();

        let names: Vec<_> = manifest.dependencies.keys().cloned().collect();
        assert_eq!(names, vec!["zlib", "express", "async"]);
        assert_eq!(manifest.dependencies["express"], "~3.0.0");
        assert_eq!(manifest.dev_dependencies["mocha"], "*");
        assert_eq!(manifest.name.as_deref(), Some("my-app"));
        assert_eq!(manifest.version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn parse_accepts_empty_dependencies() {
        let manifest = parse(r#"{"dependencies": {}}"#).unwrap();

        assert!(manifest.dependencies.is_empty());
        assert!(manifest.dev_dependencies.is_empty());
    }

    #[test]
    fn parse_fails_without_dependencies_section() {
        let result = parse(r#"{"name": "my-app"}"#);

        assert!(matches!(result, Err(ManifestError::Parse(_))));
    }

    #[test]
    fn parse_fails_on_invalid_json() {
        let result = parse("<html>not json</html>");

        assert!(matches!(result, Err(ManifestError::Parse(_))));
    }

    #[test]
    fn parse_fails_on_non_string_constraint() {
        let result = parse(r#"{"dependencies": {"a": 1}}"#);

        assert!(matches!(result, Err(ManifestError::Parse(_))));
    }

    #[test]
    fn parse_fails_on_non_object_document() {
        let result = parse(r#""dependencies""#);

        assert!(matches!(result, Err(ManifestError::Parse(_))));
    }
}

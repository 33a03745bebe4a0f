use semver::Version;

/// Outcome of comparing a declared constraint with the latest published version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    /// The latest version satisfies the constraint
    Latest,
    /// The latest version is above everything the constraint allows
    Outdated,
    /// The constraint only allows versions above the latest published one
    Newer,
    /// The constraint or the latest version could not be parsed
    Invalid,
}

/// Parse a published version, accepting an optional `v` or `=` prefix
pub fn parse_published(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Find the semantically maximum version from a list
///
/// Invalid versions are skipped.
pub fn find_semantic_max<'a, I>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    versions
        .into_iter()
        .filter_map(|v| parse_published(v).map(|parsed| (v, parsed)))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(original, _)| original.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![], None)]
    #[case(vec!["v1.0.0", "v2.0.0", "v1.5.0"], Some("v2.0.0"))]
    #[case(vec!["1.0.0", "2.0.0", "1.5.0"], Some("2.0.0"))]
    #[case(vec!["1.0.0", "2.0.0-beta.1", "1.9.0"], Some("2.0.0-beta.1"))]
    #[case(vec!["invalid", "v1.0.0", "not-semver"], Some("v1.0.0"))]
    #[case(vec!["invalid", "not-semver"], None)]
    fn find_semantic_max_returns_expected(
        #[case] versions: Vec<&str>,
        #[case] expected: Option<&str>,
    ) {
        let versions: Vec<String> = versions.into_iter().map(|s| s.to_string()).collect();
        assert_eq!(
            find_semantic_max(&versions),
            expected.map(|s| s.to_string())
        );
    }

    #[rstest]
    #[case("1.2.3", Some(Version::new(1, 2, 3)))]
    #[case("v1.2.3", Some(Version::new(1, 2, 3)))]
    #[case("=1.2.3", Some(Version::new(1, 2, 3)))]
    #[case(" 1.2.3 ", Some(Version::new(1, 2, 3)))]
    #[case("1.2", None)]
    #[case("latest", None)]
    fn parse_published_returns_expected(#[case] input: &str, #[case] expected: Option<Version>) {
        assert_eq!(parse_published(input), expected);
    }
}

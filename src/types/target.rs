//! Monitored repository targets and their release filters.

use regex::Regex;

use super::RepoId;

/// Which releases of a target are eligible for notification.
#[derive(Debug, Clone)]
pub enum ReleaseFilter {
    /// Every new version, regardless of stability.
    All,

    /// Reject anything classified as a prerelease.
    StableOnly,

    /// Reject anything classified as stable.
    PrereleaseOnly,

    /// Require the tag to match the given pattern, independent of stability.
    Pattern(Regex),
}

impl ReleaseFilter {
    /// Builds a pattern filter, validating the regex up front.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(ReleaseFilter::Pattern(Regex::new(pattern)?))
    }
}

impl PartialEq for ReleaseFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ReleaseFilter::All, ReleaseFilter::All)
            | (ReleaseFilter::StableOnly, ReleaseFilter::StableOnly)
            | (ReleaseFilter::PrereleaseOnly, ReleaseFilter::PrereleaseOnly) => true,
            (ReleaseFilter::Pattern(a), ReleaseFilter::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// One monitored repository, as produced by the config layer.
///
/// Immutable after config load; the scheduler owns targets for the duration
/// of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryTarget {
    /// The repository to watch.
    pub repo: RepoId,

    /// Human-readable name used in notification payloads.
    pub display_name: String,

    /// Disabled targets are skipped (and reported as unchecked) each cycle.
    pub enabled: bool,

    /// Which releases are eligible for notification.
    pub filter: ReleaseFilter,
}

impl RepositoryTarget {
    /// Creates an enabled target with the `All` filter and a display name
    /// derived from the repository identifier.
    pub fn new(repo: RepoId) -> Self {
        let display_name = repo.to_string();
        RepositoryTarget {
            repo,
            display_name,
            enabled: true,
            filter: ReleaseFilter::All,
        }
    }

    /// Sets the release filter.
    pub fn with_filter(mut self, filter: ReleaseFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Enables or disables the target.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_target_defaults() {
        let target = RepositoryTarget::new(RepoId::new("octo", "example"));
        assert!(target.enabled);
        assert_eq!(target.display_name, "octo/example");
        assert_eq!(target.filter, ReleaseFilter::All);
    }

    #[test]
    fn pattern_filter_validates_regex() {
        assert!(ReleaseFilter::pattern(r"^v\d+\.\d+\.\d+$").is_ok());
        assert!(ReleaseFilter::pattern(r"[unclosed").is_err());
    }

    #[test]
    fn pattern_filters_compare_by_pattern_text() {
        let a = ReleaseFilter::pattern(r"^v1\.").unwrap();
        let b = ReleaseFilter::pattern(r"^v1\.").unwrap();
        let c = ReleaseFilter::pattern(r"^v2\.").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn builder_methods() {
        let target = RepositoryTarget::new(RepoId::new("octo", "example"))
            .with_display_name("Example")
            .with_enabled(false)
            .with_filter(ReleaseFilter::StableOnly);
        assert_eq!(target.display_name, "Example");
        assert!(!target.enabled);
        assert_eq!(target.filter, ReleaseFilter::StableOnly);
    }
}

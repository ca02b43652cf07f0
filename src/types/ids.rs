//! Newtype wrappers for domain identifiers.
//!
//! `RepoId` prevents accidental mixing of repository identifiers with other
//! strings and makes the code more self-documenting. It doubles as the key
//! in the persisted state file (via its `owner/repo` display form).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a repository identifier fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository identifier {input:?}: expected \"owner/repo\"")]
pub struct ParseRepoIdError {
    /// The string that failed to parse.
    pub input: String,
}

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses an `owner/repo` string.
    ///
    /// Rejects inputs without exactly one `/`, or with an empty owner or
    /// repo component.
    pub fn parse(s: &str) -> Result<Self, ParseRepoIdError> {
        let mut parts = s.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(owner), Some(repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(RepoId::new(owner, repo))
            }
            _ => Err(ParseRepoIdError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl std::str::FromStr for RepoId {
    type Err = ParseRepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn serde_roundtrip(
            owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
            repo in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}"
        ) {
            let id = RepoId::new(&owner, &repo);
            let json = serde_json::to_string(&id).unwrap();
            let parsed: RepoId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(id, parsed);
        }

        #[test]
        fn display_parse_roundtrip(
            owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
            repo in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}"
        ) {
            let id = RepoId::new(&owner, &repo);
            let parsed = RepoId::parse(&id.to_string()).unwrap();
            prop_assert_eq!(id, parsed);
        }
    }

    #[test]
    fn parse_rejects_missing_slash() {
        assert!(RepoId::parse("just-a-name").is_err());
    }

    #[test]
    fn parse_rejects_empty_components() {
        assert!(RepoId::parse("/repo").is_err());
        assert!(RepoId::parse("owner/").is_err());
        assert!(RepoId::parse("/").is_err());
    }

    #[test]
    fn parse_rejects_extra_slashes() {
        assert!(RepoId::parse("owner/repo/extra").is_err());
    }

    #[test]
    fn display_format() {
        let id = RepoId::new("octo", "example");
        assert_eq!(id.to_string(), "octo/example");
    }
}

//! Release comparator: pure decision logic, no I/O.
//!
//! Given the last-notified version for a repository and a freshly fetched
//! candidate release, this module decides whether to notify. The decision
//! combines three rules:
//!
//! - **Version ordering**: semantic-versioning comparison where both tags
//!   parse as semver; lexicographic fallback (with a logged warning)
//!   otherwise.
//! - **Stability classification**: a release is a prerelease if the provider
//!   flags it as such OR the tag contains a known prerelease marker. This is
//!   an OR: the provider flag cannot be overridden by marker absence.
//! - **Filter policy**: all / stable-only / prerelease-only / tag pattern.

mod decision;
mod stability;
mod version;

pub use decision::{Decision, SkipReason, should_notify};
pub use stability::is_prerelease;
pub use version::{compare_tags, is_strictly_newer, parse_tag, ParsedTag};

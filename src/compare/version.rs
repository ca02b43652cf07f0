//! Version tag parsing and ordering.
//!
//! Tags that parse as semantic versions (with an optional leading `v`/`V`)
//! are compared under semver rules. When either side fails to parse, both
//! tags fall back to lexicographic comparison on the raw strings; this is a
//! recorded warning, not an error, so unconventional tagging schemes still
//! get best-effort ordering.

use std::cmp::Ordering;

use semver::Version;
use tracing::warn;

/// A parsed release tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTag {
    /// The tag parsed as a semantic version.
    Semver(Version),

    /// The tag did not parse; comparison falls back to the raw string.
    Opaque(String),
}

/// Parses a release tag, stripping an optional leading `v`/`V`.
pub fn parse_tag(tag: &str) -> ParsedTag {
    let stripped = tag
        .strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag);

    match Version::parse(stripped) {
        Ok(version) => ParsedTag::Semver(version),
        Err(_) => ParsedTag::Opaque(tag.to_string()),
    }
}

/// Compares two release tags.
///
/// Both semver: semver ordering. Otherwise: lexicographic ordering on the
/// raw tags, with a warning recorded for the non-semver side(s).
pub fn compare_tags(a: &str, b: &str) -> Ordering {
    match (parse_tag(a), parse_tag(b)) {
        (ParsedTag::Semver(va), ParsedTag::Semver(vb)) => va.cmp(&vb),
        (pa, pb) => {
            for (tag, parsed) in [(a, &pa), (b, &pb)] {
                if matches!(parsed, ParsedTag::Opaque(_)) {
                    warn!(tag, "tag is not a semantic version, falling back to lexicographic comparison");
                }
            }
            a.cmp(b)
        }
    }
}

/// Returns true when `candidate` is strictly newer than `last`.
pub fn is_strictly_newer(candidate: &str, last: &str) -> bool {
    compare_tags(candidate, last) == Ordering::Greater
}

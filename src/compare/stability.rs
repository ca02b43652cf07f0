//! Stability classification for releases.

use crate::types::ReleaseInfo;

/// Tag substrings that mark a release as a prerelease, checked
/// case-insensitively. `pre` intentionally also covers `preview`-style
/// variants beyond the explicit entry.
const PRERELEASE_MARKERS: &[&str] = &["rc", "alpha", "beta", "preview", "pre"];

/// Classifies a release as prerelease or stable.
///
/// A release is a prerelease if the provider flags it as such OR its tag
/// contains any known marker. The provider flag can never be overridden by
/// the absence of markers.
pub fn is_prerelease(release: &ReleaseInfo) -> bool {
    if release.is_prerelease {
        return true;
    }
    tag_has_prerelease_marker(&release.tag)
}

fn tag_has_prerelease_marker(tag: &str) -> bool {
    let tag_lower = tag.to_lowercase();
    PRERELEASE_MARKERS
        .iter()
        .any(|marker| tag_lower.contains(marker))
}

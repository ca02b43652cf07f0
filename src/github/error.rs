//! Fetch error types.
//!
//! The taxonomy drives both retry behavior and cycle control flow:
//!
//! - **Auth** failures are fatal to the whole run - every subsequent call
//!   would fail the same way, so they are surfaced immediately.
//! - **RateLimited** failures are transient but must not be retried
//!   immediately; the caller backs off until the next cycle.
//! - **Transient** failures (5xx, network, timeouts) are retried in place
//!   with backoff.
//! - **Permanent** failures (remaining 4xx) are reported and contained to
//!   the affected repository.
//!
//! "Repository has no releases" is not an error at all; the client returns
//! `Ok(None)` for it.

use std::fmt;

use thiserror::Error;

/// The kind of fetch error, categorized for retry and cycle decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Credentials invalid or missing where required. Fatal to the run.
    Auth,

    /// The provider reported exhausted quota, or the local budget's bounded
    /// wait expired. Back off and retry next cycle.
    RateLimited,

    /// Transient failure - safe to retry with backoff.
    Transient,

    /// Permanent failure for this repository; contained, not retried.
    Permanent,
}

impl FetchErrorKind {
    /// Returns true if this error is worth retrying in place.
    ///
    /// `RateLimited` returns false: the correct response is to back off
    /// until the next cycle, not to hammer the API.
    pub fn is_retriable(&self) -> bool {
        matches!(self, FetchErrorKind::Transient)
    }
}

/// A release fetch error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct FetchError {
    /// The kind of error.
    pub kind: FetchErrorKind,

    /// The HTTP status code, if one could be determined.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "release fetch error (HTTP {}): {}", code, self.message),
            None => write!(f, "release fetch error: {}", self.message),
        }
    }
}

impl FetchError {
    /// Creates an auth error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Auth,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a rate-limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::RateLimited,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an underlying source.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if the error indicates a missing repository or release.
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// Categorizes an octocrab error.
    ///
    /// The categorization is based on HTTP status codes extracted from the
    /// error text plus message patterns for known GitHub API responses.
    /// octocrab does not expose a stable status accessor across its error
    /// variants, so string extraction with a conservative `None` fallback is
    /// the pragmatic option; an unknown status categorizes by message alone.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let message = err.to_string();
        let status_code = extract_status_code(&message);

        let kind = match status_code {
            Some(401) => FetchErrorKind::Auth,
            Some(403) if is_rate_limit_message(&message) => FetchErrorKind::RateLimited,
            Some(403) => FetchErrorKind::Auth,
            Some(429) => FetchErrorKind::RateLimited,
            Some(code) if (500..600).contains(&code) => FetchErrorKind::Transient,
            Some(_) => FetchErrorKind::Permanent,
            None => {
                if is_rate_limit_message(&message) {
                    FetchErrorKind::RateLimited
                } else if is_auth_message(&message) {
                    FetchErrorKind::Auth
                } else if is_network_message(&message) {
                    FetchErrorKind::Transient
                } else {
                    FetchErrorKind::Permanent
                }
            }
        };

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }
}

/// Extracts the HTTP status code from an octocrab error's text, if present.
fn extract_status_code(err_str: &str) -> Option<u16> {
    // octocrab includes "status: NNN" in some error renderings
    if let Some(idx) = err_str.find("status: ") {
        let rest = &err_str[idx + 8..];
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .map_or(rest, |end| &rest[..end]);
        if let Ok(code) = digits.trim().parse() {
            return Some(code);
        }
    }

    // Fall back to well-known codes appearing standalone in the message.
    for code in [401u16, 403, 404, 422, 429, 500, 502, 503] {
        if contains_standalone_number(err_str, code) {
            return Some(code);
        }
    }

    None
}

/// Returns true when `code` appears in `text` with no adjoining digits, so
/// e.g. "50000" never matches 500.
fn contains_standalone_number(text: &str, code: u16) -> bool {
    let needle = code.to_string();
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(idx) = text[start..].find(&needle) {
        let begin = start + idx;
        let end = begin + needle.len();
        let before_ok = begin == 0 || !bytes[begin - 1].is_ascii_digit();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_digit();
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a credentials problem.
fn is_auth_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("bad credentials")
        || message_lower.contains("unauthorized")
        || message_lower.contains("requires authentication")
}

/// Checks if an error message indicates a network-level error.
fn is_network_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("timed out")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
}

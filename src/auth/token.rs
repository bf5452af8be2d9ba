//! Consumer token codec.
//!
//! A token is `hex(sha256(secret || user_id || issue_time))`. Nothing is
//! stored: the server recomputes the digest from the consumer's secret and
//! the values the request asserts, then compares in constant time.
//!
//! The issue time is hashed verbatim, so client and server must agree on
//! its text exactly. The canonical form is ISO 8601 at second precision
//! without a zone designator, interpreted as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// `strftime` pattern of the canonical issue-time text.
pub const ISSUE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Derive the token bound to `(secret, user_id, issue_time)`.
pub fn derive(secret: &str, user_id: &str, issue_time: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(user_id.as_bytes());
    hasher.update(issue_time.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute the token and compare it to `candidate` as a whole.
pub fn verify(candidate: &str, secret: &str, user_id: &str, issue_time: &str) -> bool {
    let expected = derive(secret, user_id, issue_time);
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

/// Render a timestamp in the canonical issue-time text.
pub fn format_issue_time(t: DateTime<Utc>) -> String {
    t.format(ISSUE_TIME_FORMAT).to_string()
}

/// Parse an issue time.
///
/// The canonical zone-less form is read as UTC. RFC 3339 text with an
/// explicit offset is also understood and converted to UTC.
pub fn parse_issue_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, ISSUE_TIME_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

//! Stored response representation.

use chrono::{DateTime, Utc};

/// A response held by a named cache: status, headers, body bytes, and the
/// moment it was captured from the network.
///
/// Entries are immutable once stored; revalidation overwrites the whole
/// entry rather than patching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Create a response captured now.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
            captured_at: Utc::now(),
        }
    }

    /// Override the capture timestamp (used when rehydrating from storage
    /// and for age-based tests).
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = at;
        self
    }

    /// Whether the stored status is a 2xx success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The generic placeholder served when no other source can satisfy a
    /// non-document request.
    pub fn service_unavailable() -> Self {
        Self::new(
            503,
            vec![("content-type".into(), "text/plain".into())],
            b"Service Unavailable".to_vec(),
        )
    }
}

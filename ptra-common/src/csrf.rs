//! CSRF token lifecycle
//!
//! A token is 32 random bytes, hex encoded, stored in the session together
//! with its creation time. It expires after a fixed window and is
//! regenerated on demand when missing or expired. Validation compares in
//! constant time and rejects absent or expired tokens.
//!
//! These are pure functions over the session slot; the caller supplies
//! the current time.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Number of random bytes in a token (64 hex characters)
pub const CSRF_TOKEN_BYTES: usize = 32;

/// Form field carrying the token
pub const CSRF_FIELD_NAME: &str = "csrf_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    value: String,
    issued_at: DateTime<Utc>,
}

impl CsrfToken {
    /// Generate a fresh random token
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; CSRF_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            value: hex::encode(bytes),
            issued_at: now,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at > ttl
    }

    /// Constant-time comparison against a submitted value
    pub fn matches(&self, provided: &str) -> bool {
        self.value.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

/// Return the session's token, regenerating it when missing or expired
pub fn issue_token(slot: &mut Option<CsrfToken>, now: DateTime<Utc>, ttl: Duration) -> String {
    let needs_new = match slot {
        Some(token) => token.is_expired(now, ttl),
        None => true,
    };
    if needs_new {
        *slot = Some(CsrfToken::generate(now));
    }
    slot.as_ref()
        .map(|t| t.value().to_string())
        .unwrap_or_default()
}

/// Validate a submitted token against the session slot
pub fn verify_token(
    slot: Option<&CsrfToken>,
    provided: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> bool {
    match slot {
        None => false,
        Some(token) if token.is_expired(now, ttl) => false,
        Some(token) => token.matches(provided),
    }
}

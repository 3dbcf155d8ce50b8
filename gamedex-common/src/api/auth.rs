//! Shared-secret header validation
//!
//! Administrative endpoints (manual refresh, cache clearing) require the
//! caller to present a pre-shared key in the `x-api-key` header. The key is
//! configured per deployment; when no key is configured every request is
//! rejected.
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies here; the axum middleware lives in the
//! service crate.

use sha2::{Digest, Sha256};

/// Header carrying the shared secret
pub const REFRESH_KEY_HEADER: &str = "x-api-key";

// ========================================
// Error Types
// ========================================

/// Reasons a shared-secret check fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Server has no secret configured
    NotConfigured,

    /// Request did not carry the header
    Missing,

    /// Header present but wrong
    Mismatch,
}

impl std::fmt::Display for SecretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretError::NotConfigured => write!(f, "No API key configured on server"),
            SecretError::Missing => write!(f, "Missing {} header", REFRESH_KEY_HEADER),
            SecretError::Mismatch => write!(f, "Invalid API key"),
        }
    }
}

impl std::error::Error for SecretError {}

// ========================================
// Validation
// ========================================

/// Compare a provided secret against the configured one
///
/// Both sides are hashed before comparison so the comparison time does not
/// depend on how long a matching prefix is.
///
/// # Examples
///
/// ```
/// use gamedex_common::api::auth::{check_shared_secret, SecretError};
///
/// assert!(check_shared_secret(Some("s3cret"), Some("s3cret")).is_ok());
/// assert_eq!(check_shared_secret(None, Some("s3cret")), Err(SecretError::Missing));
/// assert_eq!(check_shared_secret(Some("s3cret"), None), Err(SecretError::NotConfigured));
/// ```
pub fn check_shared_secret(provided: Option<&str>, expected: Option<&str>) -> Result<(), SecretError> {
    let expected = match expected {
        Some(e) if !e.trim().is_empty() => e,
        _ => return Err(SecretError::NotConfigured),
    };

    let provided = provided.ok_or(SecretError::Missing)?;

    let provided_digest = Sha256::digest(provided.as_bytes());
    let expected_digest = Sha256::digest(expected.as_bytes());

    let diff = provided_digest
        .iter()
        .zip(expected_digest.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if diff == 0 {
        Ok(())
    } else {
        Err(SecretError::Mismatch)
    }
}

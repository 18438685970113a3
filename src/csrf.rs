// SPDX-License-Identifier: MIT

//! Anti-forgery token guard.
//!
//! Tokens are issued lazily, once per session, and validated against the
//! submitted form field before any state-changing write. There is exactly
//! one validation path; the session-stored token is authoritative.

use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::session::{random_hex, SessionHandle};

/// Anti-forgery token entropy in bytes (128 bits).
const TOKEN_BYTES: usize = 16;

/// Return the session's anti-forgery token, generating one if absent.
///
/// Idempotent: repeated calls within the same session return the same token.
pub fn issue(session: &SessionHandle) -> Result<String, AppError> {
    if let Some(token) = session.csrf_token() {
        return Ok(token);
    }

    let token = random_hex(TOKEN_BYTES)?;
    session.set_csrf_token(token.clone());
    Ok(token)
}

/// Validate a submitted token against the session token.
///
/// Both must be present, non-empty, and equal. The comparison is
/// constant-time so the check leaks nothing about the stored token.
pub fn validate(session_token: Option<&str>, submitted: Option<&str>) -> Result<(), AppError> {
    let (Some(expected), Some(submitted)) = (session_token, submitted) else {
        return Err(AppError::CsrfRejected);
    };

    if expected.is_empty() || submitted.is_empty() {
        return Err(AppError::CsrfRejected);
    }

    if bool::from(expected.as_bytes().ct_eq(submitted.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::CsrfRejected)
    }
}

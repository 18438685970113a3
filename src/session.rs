// SPDX-License-Identifier: MIT

//! Cookie-backed session store.
//!
//! Sessions live in an in-process map keyed by an opaque random identifier.
//! The identifier travels in a cookie signed with HMAC-SHA256; a cookie that
//! fails verification is treated the same as no cookie at all and the request
//! gets a fresh session.

use std::sync::Arc;

use anyhow::anyhow;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "portal_session";

/// Session identifier entropy in bytes (128 bits).
const SESSION_ID_BYTES: usize = 16;

/// Identity claims copied from the provider at callback time.
///
/// These are not re-validated against the user table afterwards; the table
/// is only consulted for the locally editable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Per-browser session state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<Claims>,
    pub csrf_token: Option<String>,
}

/// In-memory session store shared across request handlers.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    signing_key: Arc<Vec<u8>>,
}

impl SessionStore {
    pub fn new(secret: &str) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            signing_key: Arc::new(secret.as_bytes().to_vec()),
        }
    }

    /// Resolve the session referenced by a cookie value, or mint a new one.
    ///
    /// Returns the session handle plus, when a new session was created, the
    /// signed cookie value the response must set.
    pub fn resolve(
        &self,
        cookie_value: Option<&str>,
    ) -> Result<(SessionHandle, Option<String>), AppError> {
        if let Some(id) = cookie_value.and_then(|value| self.verify(value)) {
            if self.sessions.contains_key(&id) {
                return Ok((self.handle(id), None));
            }
        }

        let id = random_hex(SESSION_ID_BYTES)?;
        self.sessions.insert(id.clone(), Session::default());
        let cookie_value = self.sign(&id)?;
        tracing::debug!("Minted new session");
        Ok((self.handle(id), Some(cookie_value)))
    }

    fn handle(&self, id: String) -> SessionHandle {
        SessionHandle {
            id,
            sessions: self.sessions.clone(),
        }
    }

    /// `{id}.{hex(hmac_sha256(id))}`
    fn sign(&self, id: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| AppError::Internal(anyhow!("HMAC init failed: {}", e)))?;
        mac.update(id.as_bytes());
        Ok(format!(
            "{}.{}",
            id,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// Verify a cookie value and extract the session id, if authentic.
    fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id, signature) = cookie_value.split_once('.')?;

        let mut mac = HmacSha256::new_from_slice(&self.signing_key).ok()?;
        mac.update(id.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Some(id.to_string())
        } else {
            tracing::warn!("Session cookie signature mismatch");
            None
        }
    }
}

/// Handle to a single session inside the store.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    sessions: Arc<DashMap<String, Session>>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> Option<Claims> {
        self.sessions.get(&self.id).and_then(|s| s.user.clone())
    }

    pub fn set_user(&self, claims: Claims) {
        let mut session = self.sessions.entry(self.id.clone()).or_default();
        session.user = Some(claims);
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.sessions
            .get(&self.id)
            .and_then(|s| s.csrf_token.clone())
    }

    pub fn set_csrf_token(&self, token: String) {
        let mut session = self.sessions.entry(self.id.clone()).or_default();
        session.csrf_token = Some(token);
    }

    /// Drop everything stored in the session (user and anti-forgery token).
    pub fn clear(&self) {
        self.sessions.insert(self.id.clone(), Session::default());
    }
}

/// Fill `num_bytes` from the system CSPRNG and hex-encode them.
pub(crate) fn random_hex(num_bytes: usize) -> Result<String, AppError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; num_bytes];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow!("system RNG failure")))?;
    Ok(hex::encode(bytes))
}

//! User model for storage and rendering.

use serde::{Deserialize, Serialize};

/// Locally mirrored user record, one row per identity-provider subject.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Row id
    pub id: i64,
    /// Stable identity-provider subject identifier (unique key)
    pub subject: String,
    /// Last known non-empty provider-supplied email
    pub email: Option<String>,
    /// First name (user-editable)
    pub first_name: Option<String>,
    /// Last name (user-editable)
    pub last_name: Option<String>,
    /// Age (user-editable, clamped to [0, 150])
    pub age: Option<i64>,
    /// When the row was first created (RFC 3339)
    pub created_at: String,
    /// Refreshed on every write (RFC 3339)
    pub updated_at: String,
}

/// Sanitized profile edits ready to be persisted.
#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i64>,
}

// SPDX-License-Identifier: MIT

//! Profile Portal: delegated login with a locally mirrored, editable profile.
//!
//! This crate provides a small server-rendered web application that
//! authenticates users against an external OIDC provider, mirrors the
//! provider identity into a local user record, and lets the user edit a
//! bounded set of profile fields behind session-bound anti-forgery tokens.

pub mod config;
pub mod csrf;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod views;

use config::Config;
use db::Database;
use services::OidcClient;
use session::SessionStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub oidc: OidcClient,
    pub sessions: SessionStore,
}

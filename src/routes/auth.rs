// SPDX-License-Identifier: MIT

//! Delegated authentication routes.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::routes::found;
use crate::session::SessionHandle;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

/// Start the login flow - redirect to the provider authorization URL.
async fn login(State(state): State<Arc<AppState>>) -> Result<Response> {
    let auth_url = state.oidc.authorize_url()?;

    tracing::info!("Starting login flow, redirecting to provider");

    Ok(found(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Provider callback - exchange the code, mirror the identity, populate the
/// session.
async fn callback(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionHandle>,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Provider reported an error at callback"
        );
        return Err(AppError::Provider(
            "authorization was not granted".to_string(),
        ));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    let tokens = state.oidc.exchange_code(&code).await?;
    let claims = state.oidc.identity(&tokens).await?;

    let user = state
        .db
        .upsert_login(&claims.sub, claims.email.as_deref())
        .await?;

    tracing::info!(
        subject = %claims.sub,
        user_id = user.id,
        "Login completed, user record refreshed"
    );

    session.set_user(claims);

    Ok(found("/profile"))
}

/// Logout - clear the session, then redirect to the provider end-session
/// endpoint.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Response> {
    session.clear();

    let logout_url = state.oidc.logout_url(&state.config.base_url)?;

    tracing::info!("Session cleared, redirecting to provider logout");

    Ok(found(&logout_url))
}

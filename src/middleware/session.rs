// SPDX-License-Identifier: MIT

//! Session middleware.
//!
//! Resolves (or mints) the session for every request and exposes it to
//! handlers as a [`SessionHandle`] request extension. When a new session is
//! created, the signed cookie is appended to the response.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::session::SESSION_COOKIE;
use crate::AppState;

/// Attach a session to the request, setting the cookie when one is minted.
pub async fn attach_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let cookie_value = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let (session, minted) = match state.sessions.resolve(cookie_value.as_deref()) {
        Ok(resolved) => resolved,
        Err(err) => return err.into_response(),
    };

    req.extensions_mut().insert(session);
    let mut response = next.run(req).await;

    if let Some(value) = minted {
        // No Secure attribute: local deployments serve plain HTTP.
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();

        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(header_value) => {
                response.headers_mut().append(header::SET_COOKIE, header_value);
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode session cookie header");
            }
        }
    }

    response
}

// SPDX-License-Identifier: MIT

//! Shared helpers for integration tests.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use profile_portal::config::Config;
use profile_portal::db::Database;
use profile_portal::routes::create_router;
use profile_portal::services::{OidcClient, ProviderEndpoints};
use profile_portal::session::SessionStore;
use profile_portal::AppState;

/// Create a test app without a reachable identity provider.
///
/// Good enough for every route except the callback exchange.
#[allow(dead_code)]
pub async fn create_test_app() -> (Router, Arc<AppState>) {
    let config = Config::default();

    let db = Database::in_memory().await.expect("in-memory database");
    db.init_schema().await.expect("schema");

    let oidc = OidcClient::new(&config).expect("OIDC client");
    let sessions = SessionStore::new(&config.session_secret);

    let state = Arc::new(AppState {
        config,
        db,
        oidc,
        sessions,
    });

    (create_router(state.clone()), state)
}

/// Create a test app wired to a stub identity provider that serves the
/// token and userinfo endpoints with fixed claims.
#[allow(dead_code)]
pub async fn create_test_app_with_provider(
    sub: &str,
    email: Option<&str>,
    name: Option<&str>,
) -> (Router, Arc<AppState>) {
    let provider_base = spawn_stub_provider(sub, email, name).await;

    let config = Config::default();
    let endpoints = ProviderEndpoints {
        issuer: format!("{provider_base}/"),
        authorization: format!("{provider_base}/authorize"),
        token: format!("{provider_base}/oauth/token"),
        userinfo: format!("{provider_base}/userinfo"),
        jwks: format!("{provider_base}/.well-known/jwks.json"),
        end_session: format!("{provider_base}/v2/logout"),
    };

    let db = Database::in_memory().await.expect("in-memory database");
    db.init_schema().await.expect("schema");

    let oidc = OidcClient::with_endpoints(&config, endpoints).expect("OIDC client");
    let sessions = SessionStore::new(&config.session_secret);

    let state = Arc::new(AppState {
        config,
        db,
        oidc,
        sessions,
    });

    (create_router(state.clone()), state)
}

#[derive(Clone)]
struct StubState {
    userinfo: serde_json::Value,
}

/// Serve a minimal provider on an ephemeral local port.
///
/// The token endpoint returns a bare access token (no id_token), which
/// steers the app through the userinfo path.
async fn spawn_stub_provider(sub: &str, email: Option<&str>, name: Option<&str>) -> String {
    let userinfo = serde_json::json!({
        "sub": sub,
        "email": email,
        "name": name,
        "picture": null,
    });

    let router = Router::new()
        .route("/oauth/token", post(stub_token))
        .route("/userinfo", get(stub_userinfo))
        .with_state(StubState { userinfo });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub provider");
    let addr = listener.local_addr().expect("stub provider addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub provider");
    });

    format!("http://{addr}")
}

async fn stub_token() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "access_token": "stub-access-token",
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
}

async fn stub_userinfo(State(state): State<StubState>) -> Json<serde_json::Value> {
    Json(state.userinfo.clone())
}

/// Build a GET request, optionally with a session cookie.
#[allow(dead_code)]
pub fn get_request(uri: &str, cookie: Option<&str>) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(axum::body::Body::empty()).unwrap()
}

/// Build a POST form submission with a session cookie.
#[allow(dead_code)]
pub fn form_request(
    uri: &str,
    cookie: &str,
    body: impl Into<String>,
) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(body.into()))
        .unwrap()
}

/// Read a response body to a string.
#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Pull the `portal_session=...` pair out of a response, ready to be sent
/// back as a `Cookie` header.
#[allow(dead_code)]
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("portal_session="))
        .and_then(|value| value.split(';').next())
        .map(|pair| pair.to_string())
}

/// Extract the hidden anti-forgery token from a rendered profile page.
#[allow(dead_code)]
pub fn extract_csrf_token(body: &str) -> Option<String> {
    let marker = "name=\"csrf_token\" value=\"";
    let start = body.find(marker)? + marker.len();
    let end = body[start..].find('"')? + start;
    Some(body[start..end].to_string())
}

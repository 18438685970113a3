// SPDX-License-Identifier: MIT

//! Profile view and edit routes.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use serde::Deserialize;

use crate::csrf;
use crate::error::Result;
use crate::models::ProfileChanges;
use crate::routes::see_other;
use crate::session::{Claims, SessionHandle};
use crate::views::{self, Banner};
use crate::AppState;

/// User-editable name fields are capped at this many characters.
const MAX_NAME_CHARS: usize = 100;

/// Age is clamped into this inclusive range.
const AGE_MIN: i64 = 0;
const AGE_MAX: i64 = 150;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(view_profile))
        .route("/profile/update", post(update_profile))
}

/// Query flags set by the redirects out of `update_profile`.
#[derive(Deserialize)]
pub struct BannerParams {
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

impl BannerParams {
    fn banner(&self) -> Option<Banner> {
        if self.s.as_deref() == Some("1") {
            Some(Banner::Saved)
        } else if self.e.as_deref() == Some("csrf") {
            Some(Banner::CsrfRejected)
        } else {
            None
        }
    }
}

/// Render the profile form, pre-filled from the stored record.
async fn view_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionHandle>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<BannerParams>,
) -> Result<Html<String>> {
    let record = state.db.get_user_by_subject(&claims.sub).await?;
    let csrf_token = csrf::issue(&session)?;

    Ok(Html(views::profile_page(
        &claims,
        record.as_ref(),
        &csrf_token,
        params.banner(),
    )))
}

/// Raw profile form submission.
#[derive(Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    age: Option<String>,
    #[serde(default)]
    csrf_token: Option<String>,
}

/// Validate, sanitize, and persist a profile edit.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionHandle>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    if csrf::validate(session.csrf_token().as_deref(), form.csrf_token.as_deref()).is_err() {
        tracing::warn!(subject = %claims.sub, "Rejected profile update: anti-forgery mismatch");
        return Ok(see_other("/profile?e=csrf"));
    }

    let changes = ProfileChanges {
        first_name: sanitize_name(form.first_name.as_deref().unwrap_or_default()),
        last_name: sanitize_name(form.last_name.as_deref().unwrap_or_default()),
        age: parse_age(form.age.as_deref()),
    };

    let user = state
        .db
        .save_profile(&claims.sub, claims.email.as_deref(), &changes)
        .await?;

    tracing::info!(subject = %claims.sub, user_id = user.id, "Profile updated");

    Ok(see_other("/profile?s=1"))
}

/// Trim surrounding whitespace and cap the length in characters.
fn sanitize_name(raw: &str) -> String {
    raw.trim().chars().take(MAX_NAME_CHARS).collect()
}

/// Parse the optional age field, clamping into range.
///
/// Blank or non-numeric input counts as absent and stores NULL.
fn parse_age(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<i64>().ok().map(|age| age.clamp(AGE_MIN, AGE_MAX))
}

// SPDX-License-Identifier: MIT

//! Session authentication middleware.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::AppError;
use crate::session::SessionHandle;

/// Middleware that requires a logged-in session user.
///
/// On success the provider claims are inserted as a request extension for
/// the downstream handler; otherwise the request fails with 401 and no
/// store access happens.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, AppError> {
    let session = req
        .extensions()
        .get::<SessionHandle>()
        .cloned()
        .ok_or(AppError::Unauthorized)?;

    let claims = session.user().ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

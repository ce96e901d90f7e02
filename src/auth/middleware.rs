//! Authentication middleware
//!
//! Protects routes that require an authenticated caller.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get("session").map(|cookie| cookie.value().to_owned())
        })
}

fn authenticate_headers(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = extract_token_from_headers(headers).ok_or(AppError::Unauthorized)?;
    verify_session_token(
        &token,
        &state.config.auth.session_secret,
        state.config.auth.session_max_age,
    )
}

/// Middleware to require an admin caller
///
/// Rejects missing or invalid sessions with 401 and non-admin
/// sessions with 403.
///
/// # Usage
/// ```ignore
/// let admin_routes = Router::new()
///     .route("/metrics", ...)
///     .layer(middleware::from_fn_with_state(state, require_admin));
/// ```
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate_headers(request.headers(), &state)?;

    if !session.is_admin() {
        tracing::warn!(user_id = %session.user_id, "Non-admin caller rejected");
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// Use in handlers to get the caller's session.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", session.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let session = authenticate_headers(&parts.headers, &state)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}

//! Operator endpoints

use axum::{
    Router,
    extract::{Query, State},
    middleware,
    response::Json,
    routing::get,
};
use serde::Deserialize;

use crate::{AppState, auth::require_admin, error::AppError};

#[derive(Debug, Deserialize)]
pub struct AdminUsersQuery {
    /// Account status to keep, e.g. "active"
    pub status: Option<String>,
}

/// GET /admin/users - Every user with follower and following counts
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<AdminUsersQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = state.listings.admin_users(query.status.as_deref()).await?;

    Ok(Json(serde_json::json!({ "users": users })))
}

/// `/admin/*`, restricted to admin sessions
pub fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

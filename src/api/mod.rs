//! API layer
//!
//! HTTP handlers for:
//! - Threads (open/find, list mine)
//! - User listings and follow actions
//! - Operator user listing
//! - Metrics (Prometheus)

pub mod admin;
pub mod metrics;
mod threads;
mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use admin::admin_router;
pub use metrics::metrics_router;

/// Create the authenticated API router
///
/// Every handler extracts `CurrentUser`, so unauthenticated requests
/// are rejected with 401 before touching the store.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/threads", get(threads::list_threads))
        .route("/threads/:profile_id", post(threads::open_thread))
        .route("/profile", get(users::own_profile))
        .route("/users", get(users::list_profiles))
        .route("/users/:id", get(users::get_profile))
        .route("/users/:id/followers", get(users::get_followers))
        .route("/users/:id/followings", get(users::get_followings))
        .route(
            "/users/:id/follow",
            post(users::follow_user).delete(users::unfollow_user),
        )
        .route("/users/:id/follow/accept", post(users::accept_follow))
}

//! Thread endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{AppState, auth::CurrentUser, error::AppError};

/// GET /threads - List my threads
///
/// Every thread the caller is a member of. No pagination.
pub async fn list_threads(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let threads = state.threads.threads_for_user(&session.user_id).await?;

    Ok(Json(serde_json::json!({ "threads": threads })))
}

/// POST /threads/:profile_id - Open or find the thread with a profile
///
/// 201 with the new thread, or 200 with the thread that already existed.
/// Opening a thread with yourself is a 400.
pub async fn open_thread(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(profile_id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let opened = state
        .threads
        .find_or_create_thread(&session.user_id, &profile_id)
        .await?;

    let status = if opened.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(serde_json::json!({ "thread": opened.thread }))))
}

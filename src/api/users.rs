//! User listing and follow endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    auth::CurrentUser,
    data::{FollowStatus, ProfileCategory},
    error::AppError,
};

/// GET /profile - The caller's own profile with counters
pub async fn own_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = state.listings.own_profile(&session.user_id).await?;

    Ok(Json(serde_json::json!({ "user": profile })))
}

/// GET /users - Every other user with the caller's follow status
pub async fn list_profiles(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = state.listings.profiles(&session.user_id).await?;

    Ok(Json(serde_json::json!({ "users": users })))
}

/// GET /users/:id - Profile with counters and the caller's follow status
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = state.listings.profile(&session.user_id, &id).await?;

    Ok(Json(serde_json::json!({ "user": profile })))
}

/// GET /users/:id/followers
pub async fn get_followers(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = state.listings.followers(&session.user_id, &id).await?;

    Ok(Json(serde_json::json!({ "users": users })))
}

/// GET /users/:id/followings
pub async fn get_followings(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = state.listings.followings(&session.user_id, &id).await?;

    Ok(Json(serde_json::json!({ "users": users })))
}

/// POST /users/:id/follow - Follow a user
///
/// Public profiles are followed immediately; private profiles get a
/// pending request. Repeating the call returns the existing edge.
pub async fn follow_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if session.user_id == id {
        return Err(AppError::Validation("cannot follow yourself".to_string()));
    }

    let target = state.db.get_user(&id).await?.ok_or(AppError::NotFound)?;
    let status = match target.profile_category {
        ProfileCategory::Public => FollowStatus::Approved,
        ProfileCategory::Private => FollowStatus::Pending,
    };

    let (follow, created) = state.db.insert_follow(&session.user_id, &id, status).await?;
    if created {
        tracing::info!(
            follower_id = %follow.follower_id,
            following_id = %follow.following_id,
            status = follow.status.as_str(),
            "Follow created"
        );
    }

    let code = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((code, Json(serde_json::json!({ "follow": follow }))))
}

/// POST /users/:id/follow/accept - Accept a pending follow from `:id`
pub async fn accept_follow(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let approved = state.db.approve_follow(&id, &session.user_id).await?;
    if !approved {
        return Err(AppError::NotFound);
    }

    let follow = state
        .db
        .get_follow(&id, &session.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(serde_json::json!({ "follow": follow })))
}

/// DELETE /users/:id/follow - Unfollow a user
pub async fn unfollow_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_follow(&session.user_id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

//! User listings
//!
//! Every listing pairs plain user attributes with the viewer-relative
//! follow status, resolved in one batch per listing.

use std::sync::Arc;

use serde::Serialize;

use super::relationship::{RelationshipResolver, RelationshipStatus};
use crate::data::{Database, ProfileCategory, User, UserWithCounts};
use crate::error::AppError;

/// User as shown in a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub avatar: Option<String>,
    pub status: String,
    pub profile_category: ProfileCategory,
    pub follow_status: RelationshipStatus,
}

impl UserSummary {
    fn from_user(user: User, follow_status: RelationshipStatus) -> Self {
        Self {
            id: user.id,
            firstname: user.firstname,
            lastname: user.lastname,
            avatar: user.avatar,
            status: user.status,
            profile_category: user.profile_category,
            follow_status,
        }
    }
}

/// Single profile with relationship counters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub followers_count: i64,
    pub followings_count: i64,
}

/// User with relationship counters and no viewer status
///
/// Shown to the user themselves and to operators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedUser {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub avatar: Option<String>,
    pub status: String,
    pub profile_category: ProfileCategory,
    pub role: String,
    pub followers_count: i64,
    pub followings_count: i64,
}

impl From<UserWithCounts> for CountedUser {
    fn from(row: UserWithCounts) -> Self {
        let user = row.user;
        Self {
            id: user.id,
            firstname: user.firstname,
            lastname: user.lastname,
            email: user.email,
            avatar: user.avatar,
            status: user.status,
            profile_category: user.profile_category,
            role: user.role,
            followers_count: row.followers_count,
            followings_count: row.followings_count,
        }
    }
}

/// User listing service
pub struct UserListingService {
    db: Arc<Database>,
    resolver: RelationshipResolver,
}

impl UserListingService {
    pub fn new(db: Arc<Database>) -> Self {
        let resolver = RelationshipResolver::new(db.clone());
        Self { db, resolver }
    }

    /// Profile of `profile_id` as seen by `viewer_id`
    pub async fn profile(&self, viewer_id: &str, profile_id: &str) -> Result<ProfileView, AppError> {
        let user = self.db.get_user(profile_id).await?.ok_or(AppError::NotFound)?;
        let follow_status = self.resolver.resolve_one(viewer_id, profile_id).await?;
        let followers_count = self.db.count_followers(profile_id).await?;
        let followings_count = self.db.count_followings(profile_id).await?;

        Ok(ProfileView {
            user: UserSummary::from_user(user, follow_status),
            followers_count,
            followings_count,
        })
    }

    /// The caller's own profile with counters
    pub async fn own_profile(&self, user_id: &str) -> Result<CountedUser, AppError> {
        let user = self.db.get_user(user_id).await?.ok_or(AppError::NotFound)?;
        let followers_count = self.db.count_followers(user_id).await?;
        let followings_count = self.db.count_followings(user_id).await?;

        Ok(UserWithCounts {
            user,
            followers_count,
            followings_count,
        }
        .into())
    }

    /// Operator listing of every user with counters
    ///
    /// `status` keeps only accounts in that status.
    pub async fn admin_users(&self, status: Option<&str>) -> Result<Vec<CountedUser>, AppError> {
        let rows = self.db.get_users_with_counts(status).await?;
        Ok(rows.into_iter().map(CountedUser::from).collect())
    }

    /// Every user except the viewer
    pub async fn profiles(&self, viewer_id: &str) -> Result<Vec<UserSummary>, AppError> {
        let users = self.db.get_users_except(viewer_id).await?;
        self.with_statuses(viewer_id, users).await
    }

    /// Users following `user_id`
    pub async fn followers(
        &self,
        viewer_id: &str,
        user_id: &str,
    ) -> Result<Vec<UserSummary>, AppError> {
        self.ensure_user_exists(user_id).await?;
        let users = self.db.get_followers_of(user_id).await?;
        self.with_statuses(viewer_id, users).await
    }

    /// Users `user_id` follows
    pub async fn followings(
        &self,
        viewer_id: &str,
        user_id: &str,
    ) -> Result<Vec<UserSummary>, AppError> {
        self.ensure_user_exists(user_id).await?;
        let users = self.db.get_followings_of(user_id).await?;
        self.with_statuses(viewer_id, users).await
    }

    async fn ensure_user_exists(&self, user_id: &str) -> Result<(), AppError> {
        self.db
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }

    async fn with_statuses(
        &self,
        viewer_id: &str,
        users: Vec<User>,
    ) -> Result<Vec<UserSummary>, AppError> {
        let ids: Vec<String> = users.iter().map(|user| user.id.clone()).collect();
        let statuses = self.resolver.resolve_many(viewer_id, &ids).await?;

        Ok(users
            .into_iter()
            .map(|user| {
                let status = statuses
                    .get(&user.id)
                    .copied()
                    .unwrap_or(RelationshipStatus::Unfollow);
                UserSummary::from_user(user, status)
            })
            .collect())
    }
}

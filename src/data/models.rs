//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// The two ids of an unordered user pair, smallest first
///
/// Both orderings of the same two ids produce the same tuple. The ids are
/// kept apart rather than joined, so no id content can make two pairs equal.
pub fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

// =============================================================================
// User
// =============================================================================

/// Visibility of a user's profile
///
/// Private profiles turn incoming follows into pending requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProfileCategory {
    Public,
    Private,
}

/// A user, owned by the account collaborator
///
/// Credentials never reach this table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub avatar: Option<String>,
    /// Account status: active, blocked
    pub status: String,
    pub profile_category: ProfileCategory,
    /// Role list, e.g. "user" or "admin"
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row carrying its relationship counters
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserWithCounts {
    #[sqlx(flatten)]
    pub user: User,
    pub followers_count: i64,
    pub followings_count: i64,
}

// =============================================================================
// Follow relationships
// =============================================================================

/// State of a directed follow edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FollowStatus {
    Pending,
    Approved,
}

impl FollowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

/// Directed edge `follower_id -> following_id`
///
/// At most one row exists per ordered pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: String,
    pub following_id: String,
    pub status: FollowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Threads
// =============================================================================

/// Conversation container shared by exactly two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Thread {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join row binding a user to a thread
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThreadMembership {
    pub thread_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Authorization state of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ThreadRequestStatus {
    Pending,
    Accepted,
}

impl ThreadRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

/// Who opened a thread, and whether the receiver has to accept it
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThreadRequest {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub status: ThreadRequestStatus,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
}

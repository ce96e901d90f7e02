//! SQLite database operations
//!
//! All database access goes through this module.
//! Queries bind every caller-supplied value; no SQL is built by string
//! interpolation of ids.

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

const USER_COLUMNS: &str = "u.id, u.firstname, u.lastname, u.email, u.avatar, u.status, \
     u.profile_category, u.role, u.created_at, u.updated_at";

/// Upper bound on ids bound into a single `IN (...)` list
///
/// SQLite rejects statements with more than 32766 variables.
const MAX_IDS_PER_QUERY: usize = 10_000;

/// Map constraint failures raised inside the thread creation transaction.
///
/// A duplicate pair means another request won the race; a dangling user
/// reference means one of the participants does not exist.
fn map_creation_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return AppError::Conflict("thread already exists for this pair".to_string());
        }
        if db_error.is_foreign_key_violation() {
            return AppError::NotFound;
        }
    }
    AppError::Database(error)
}

/// Database connection pool wrapper.
///
/// Opened once at startup and shared through `Arc`. Call
/// [`Database::close`] at shutdown to drain the pool.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connections closed");
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a user provisioned by the account collaborator
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, firstname, lastname, email, avatar, status, profile_category, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(&user.status)
        .bind(user.profile_category)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get every user except `viewer_id`
    pub async fn get_users_except(&self, viewer_id: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id <> ? ORDER BY u.created_at, u.id"
        ))
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Get users with an edge towards `user_id`
    pub async fn get_followers_of(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users u
            INNER JOIN follows f ON f.follower_id = u.id
            WHERE f.following_id = ?
            ORDER BY u.created_at, u.id
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Get users that `user_id` has an edge towards
    pub async fn get_followings_of(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users u
            INNER JOIN follows f ON f.following_id = u.id
            WHERE f.follower_id = ?
            ORDER BY u.created_at, u.id
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Get every user with follower and following counts
    ///
    /// `status` narrows the listing to one account status when given.
    pub async fn get_users_with_counts(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<UserWithCounts>, AppError> {
        let users = sqlx::query_as::<_, UserWithCounts>(&format!(
            r#"
            SELECT {USER_COLUMNS},
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS followers_count,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS followings_count
            FROM users u
            WHERE ? IS NULL OR u.status = ?
            ORDER BY u.created_at, u.id
            "#
        ))
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Follow relationships
    // =========================================================================

    /// Get the edge `follower_id -> following_id`, if any
    pub async fn get_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<Follow>, AppError> {
        let follow = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(follow)
    }

    /// Get the status of every edge from `follower_id` to any of `targets`
    ///
    /// Bulk read: one query per `MAX_IDS_PER_QUERY` targets, never one per
    /// target. Targets without an edge are simply absent from the result.
    pub async fn get_follow_statuses_from(
        &self,
        follower_id: &str,
        targets: &[String],
    ) -> Result<Vec<(String, FollowStatus)>, AppError> {
        let mut rows = Vec::new();

        for chunk in targets.chunks(MAX_IDS_PER_QUERY) {
            let mut query_builder = QueryBuilder::<Sqlite>::new(
                "SELECT following_id, status FROM follows WHERE follower_id = ",
            );
            query_builder.push_bind(follower_id);
            query_builder.push(" AND following_id IN (");
            {
                let mut separated = query_builder.separated(", ");
                for target in chunk {
                    separated.push_bind(target);
                }
            }
            query_builder.push(")");

            let chunk_rows = query_builder
                .build_query_as::<(String, FollowStatus)>()
                .fetch_all(&self.pool)
                .await?;
            rows.extend(chunk_rows);
        }

        Ok(rows)
    }

    /// Insert an edge unless one already exists for the ordered pair
    ///
    /// # Returns
    /// The stored edge and whether this call created it
    pub async fn insert_follow(
        &self,
        follower_id: &str,
        following_id: &str,
        status: FollowStatus,
    ) -> Result<(Follow, bool), AppError> {
        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, following_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_creation_error)?;

        let follow = self
            .get_follow(follower_id, following_id)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok((follow, inserted.rows_affected() > 0))
    }

    /// Move a pending edge to approved
    ///
    /// # Returns
    /// false if there was no pending edge
    pub async fn approve_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE follows SET status = 'approved', updated_at = ? WHERE follower_id = ? AND following_id = ? AND status = 'pending'",
        )
        .bind(Utc::now())
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete the edge `follower_id -> following_id`
    pub async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count edges pointing at `user_id`
    pub async fn count_followers(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE following_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Count edges leaving `user_id`
    pub async fn count_followings(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Threads
    // =========================================================================

    /// Get a thread by ID
    pub async fn get_thread(&self, id: &str) -> Result<Option<Thread>, AppError> {
        let thread = sqlx::query_as::<_, Thread>("SELECT * FROM threads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(thread)
    }

    /// Get threads by IDs, newest first
    pub async fn get_threads_by_ids(&self, ids: &[String]) -> Result<Vec<Thread>, AppError> {
        let mut threads = Vec::new();

        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let mut query_builder =
                QueryBuilder::<Sqlite>::new("SELECT * FROM threads WHERE id IN (");
            {
                let mut separated = query_builder.separated(", ");
                for id in chunk {
                    separated.push_bind(id);
                }
            }
            query_builder.push(")");

            let chunk_threads = query_builder
                .build_query_as::<Thread>()
                .fetch_all(&self.pool)
                .await?;
            threads.extend(chunk_threads);
        }

        threads.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(threads)
    }

    /// Get IDs of every thread `user_id` is a member of
    pub async fn get_thread_ids_for_user(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT thread_id FROM thread_users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Get the membership rows of a thread
    pub async fn get_thread_members(
        &self,
        thread_id: &str,
    ) -> Result<Vec<ThreadMembership>, AppError> {
        let members = sqlx::query_as::<_, ThreadMembership>(
            "SELECT thread_id, user_id, created_at FROM thread_users WHERE thread_id = ? ORDER BY user_id",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Get the thread request for an unordered user pair
    pub async fn get_thread_request_for_pair(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<ThreadRequest>, AppError> {
        let (low, high) = ordered_pair(a, b);
        let request = sqlx::query_as::<_, ThreadRequest>(
            "SELECT id, sender_id, receiver_id, status, thread_id, created_at FROM thread_requests WHERE user_low = ? AND user_high = ?",
        )
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Create a thread, both memberships and the thread request atomically
    ///
    /// The initial request status is chosen by `decide_status` from the edge
    /// `sender_id -> receiver_id` read inside the same transaction. Nothing
    /// is persisted unless every write succeeds. The transaction rolls back
    /// when dropped, so a caller that is cancelled midway (client gone,
    /// timeout) leaves no partial rows and no open write lock behind.
    ///
    /// The first statement is a write, so the transaction holds SQLite's
    /// write lock from the start and concurrent creators queue on it.
    ///
    /// # Errors
    /// - `Conflict` if a request already exists for the pair
    /// - `NotFound` if either user does not exist
    pub async fn create_thread_with_request<F>(
        &self,
        sender_id: &str,
        receiver_id: &str,
        decide_status: F,
    ) -> Result<(Thread, ThreadRequest), AppError>
    where
        F: FnOnce(Option<&Follow>) -> ThreadRequestStatus + Send,
    {
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let thread = Thread {
            id: EntityId::new().0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query("INSERT INTO threads (id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(&thread.id)
            .bind(thread.created_at)
            .bind(thread.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_creation_error)?;

        for user_id in [sender_id, receiver_id] {
            sqlx::query("INSERT INTO thread_users (thread_id, user_id, created_at) VALUES (?, ?, ?)")
                .bind(&thread.id)
                .bind(user_id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(map_creation_error)?;
        }

        let edge = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(&mut *tx)
        .await?;

        let request = ThreadRequest {
            id: EntityId::new().0,
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            status: decide_status(edge.as_ref()),
            thread_id: thread.id.clone(),
            created_at: now,
        };

        let (low, high) = ordered_pair(sender_id, receiver_id);
        sqlx::query(
            "INSERT INTO thread_requests (id, sender_id, receiver_id, user_low, user_high, status, thread_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.sender_id)
        .bind(&request.receiver_id)
        .bind(low)
        .bind(high)
        .bind(request.status)
        .bind(&request.thread_id)
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_creation_error)?;

        tx.commit().await.map_err(|error| {
            tracing::warn!(%error, thread_id = %thread.id, "Thread creation commit failed");
            map_creation_error(error)
        })?;

        Ok((thread, request))
    }

    // =========================================================================
    // Test helpers
    // =========================================================================

    #[cfg(test)]
    pub(crate) async fn execute_for_test(&self, sql: &str) -> Result<(), AppError> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn count_rows_for_test(&self, table: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

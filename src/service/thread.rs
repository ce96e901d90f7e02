//! Thread service
//!
//! Finds or creates the single conversation thread shared by two users.

use std::sync::Arc;

use super::thread_request::decide_initial_status;
use crate::data::{Database, Thread};
use crate::error::AppError;

/// Result of opening a thread with another user
#[derive(Debug, Clone)]
pub struct OpenedThread {
    pub thread: Thread,
    /// true if this call created the thread
    pub created: bool,
}

/// Thread service
pub struct ThreadService {
    db: Arc<Database>,
}

impl ThreadService {
    /// Create new thread service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Threads `user_id` is a member of, newest first
    pub async fn threads_for_user(&self, user_id: &str) -> Result<Vec<Thread>, AppError> {
        let thread_ids = self.db.get_thread_ids_for_user(user_id).await?;
        self.db.get_threads_by_ids(&thread_ids).await
    }

    /// Find the thread shared by `user_id` and `profile_id`, creating it if needed
    ///
    /// Idempotent for either ordering of the pair. Creation writes the
    /// thread, both memberships and a thread request in one transaction,
    /// with `user_id` as the sender.
    ///
    /// Two concurrent callers may both miss the lookup; the store's
    /// uniqueness constraint rejects the loser's insert, and the loser
    /// returns the winner's thread instead of an error.
    ///
    /// # Errors
    /// - `InvalidOperation` if both ids are the same (nothing is read)
    /// - `NotFound` if either user does not exist
    pub async fn find_or_create_thread(
        &self,
        user_id: &str,
        profile_id: &str,
    ) -> Result<OpenedThread, AppError> {
        if user_id == profile_id {
            return Err(AppError::InvalidOperation(
                "cannot start a thread with yourself".to_string(),
            ));
        }

        if let Some(thread) = self.existing_thread(user_id, profile_id).await? {
            crate::metrics::record_thread_opened("existing");
            return Ok(OpenedThread {
                thread,
                created: false,
            });
        }

        match self
            .db
            .create_thread_with_request(user_id, profile_id, decide_initial_status)
            .await
        {
            Ok((thread, request)) => {
                crate::metrics::record_thread_opened("created");
                crate::metrics::THREAD_REQUESTS_CREATED_TOTAL
                    .with_label_values(&[request.status.as_str()])
                    .inc();
                tracing::info!(
                    thread_id = %thread.id,
                    sender_id = %user_id,
                    receiver_id = %profile_id,
                    status = request.status.as_str(),
                    "Thread created"
                );
                Ok(OpenedThread {
                    thread,
                    created: true,
                })
            }
            Err(AppError::Conflict(_)) => {
                crate::metrics::record_thread_opened("conflict");
                tracing::debug!(
                    sender_id = %user_id,
                    receiver_id = %profile_id,
                    "Thread created concurrently; returning existing thread"
                );
                let thread = self
                    .existing_thread(user_id, profile_id)
                    .await?
                    .ok_or(AppError::NotFound)?;
                Ok(OpenedThread {
                    thread,
                    created: false,
                })
            }
            Err(error) => Err(error),
        }
    }

    async fn existing_thread(
        &self,
        user_id: &str,
        profile_id: &str,
    ) -> Result<Option<Thread>, AppError> {
        let Some(request) = self
            .db
            .get_thread_request_for_pair(user_id, profile_id)
            .await?
        else {
            return Ok(None);
        };

        let thread = self
            .db
            .get_thread(&request.thread_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(Some(thread))
    }
}

//! Viewer-relative relationship status
//!
//! Labels target users as `pending`, `approved` or `unfollow` from the
//! point of view of a viewer. Only the edge viewer -> target is consulted.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::{Database, FollowStatus};
use crate::error::AppError;

/// Relationship label shown in user listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Pending,
    Approved,
    Unfollow,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Unfollow => "unfollow",
        }
    }
}

/// Label for the edge viewer -> target, given its status if it exists
pub fn relationship_status(edge: Option<FollowStatus>) -> RelationshipStatus {
    match edge {
        Some(FollowStatus::Pending) => RelationshipStatus::Pending,
        Some(FollowStatus::Approved) => RelationshipStatus::Approved,
        None => RelationshipStatus::Unfollow,
    }
}

/// Resolves relationship statuses against the follow store
///
/// Read-only. Results are a point-in-time snapshot and may trail a
/// concurrent follow write by one edge.
pub struct RelationshipResolver {
    db: Arc<Database>,
}

impl RelationshipResolver {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Status of a single target
    pub async fn resolve_one(
        &self,
        viewer_id: &str,
        target_id: &str,
    ) -> Result<RelationshipStatus, AppError> {
        let edge = self.db.get_follow(viewer_id, target_id).await?;
        Ok(relationship_status(edge.map(|follow| follow.status)))
    }

    /// Status of every target, fetched in one store round trip
    ///
    /// The returned map has an entry for each distinct target. A read
    /// failure fails the whole batch.
    pub async fn resolve_many(
        &self,
        viewer_id: &str,
        target_ids: &[String],
    ) -> Result<HashMap<String, RelationshipStatus>, AppError> {
        crate::metrics::RELATIONSHIP_BATCH_SIZE.observe(target_ids.len() as f64);

        let edges: HashMap<String, FollowStatus> = self
            .db
            .get_follow_statuses_from(viewer_id, target_ids)
            .await?
            .into_iter()
            .collect();

        Ok(target_ids
            .iter()
            .map(|target| {
                let status = relationship_status(edges.get(target).copied());
                (target.clone(), status)
            })
            .collect())
    }
}

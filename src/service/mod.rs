//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services receive the database handle at construction.

mod relationship;
mod thread;
mod thread_request;
mod users;

pub use relationship::{RelationshipResolver, RelationshipStatus, relationship_status};
pub use thread::{OpenedThread, ThreadService};
pub use thread_request::decide_initial_status;
pub use users::{CountedUser, ProfileView, UserListingService, UserSummary};

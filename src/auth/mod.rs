//! Caller authentication
//!
//! Handles:
//! - Session token verification
//! - Authentication extractor and admin middleware

mod middleware;
pub mod session;

pub use middleware::{CurrentUser, require_admin};
pub use session::{Session, create_session_token, verify_session_token};

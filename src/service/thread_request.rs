//! Thread request lifecycle
//!
//! A thread request starts either `pending` or `accepted` and never moves
//! within this service.

use crate::data::{Follow, ThreadRequestStatus};

/// Initial status for a request from the sender of `edge`
///
/// `edge` is the follow edge sender -> receiver. Its existence alone
/// pre-accepts the request, whatever its status. The reverse edge
/// (receiver -> sender) is deliberately not consulted.
pub fn decide_initial_status(edge: Option<&Follow>) -> ThreadRequestStatus {
    match edge {
        Some(_) => ThreadRequestStatus::Accepted,
        None => ThreadRequestStatus::Pending,
    }
}

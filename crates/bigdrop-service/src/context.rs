//! Request context carrying the authenticated caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bigdrop_core::types::id::OwnerId;

/// Context for the current authenticated request.
///
/// Built by the API layer from a validated bearer token and passed into
/// every owner-scoped service call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated caller.
    pub owner_id: OwnerId,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            request_time: Utc::now(),
        }
    }
}

//! JWT claims carried by access tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bigdrop_core::types::id::OwnerId;

/// Claims payload of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the caller that owns transfers created with this token.
    pub sub: OwnerId,
    /// Issuer.
    pub iss: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Token id.
    pub jti: Uuid,
}

impl Claims {
    /// Returns the caller id from the subject claim.
    pub fn owner_id(&self) -> OwnerId {
        self.sub
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

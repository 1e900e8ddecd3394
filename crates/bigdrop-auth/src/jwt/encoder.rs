//! Access token creation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use bigdrop_core::config::AuthConfig;
use bigdrop_core::error::AppError;
use bigdrop_core::types::id::OwnerId;

use super::claims::Claims;

/// A freshly signed token.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub access_token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Signs HS256 access tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            ttl: Duration::minutes(config.access_token_ttl_minutes as i64),
        }
    }

    /// Issue an access token for `owner` valid for the configured TTL.
    pub fn issue(&self, owner: OwnerId) -> Result<IssuedToken, AppError> {
        self.issue_with_ttl(owner, self.ttl)
    }

    /// Issue an access token with an explicit lifetime.
    pub fn issue_with_ttl(&self, owner: OwnerId, ttl: Duration) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            sub: owner,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;

        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }
}

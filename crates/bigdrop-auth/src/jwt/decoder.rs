//! Access token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use bigdrop_core::config::AuthConfig;
use bigdrop_core::error::AppError;
use bigdrop_core::types::id::OwnerId;

use super::claims::Claims;

/// Validates bearer tokens and yields the caller id.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decode and verify a token, returning its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::unauthorized("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::unauthorized("Invalid token signature")
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AppError::unauthorized("Token was issued by another service")
                }
                _ => AppError::unauthorized(format!("Token validation failed: {e}")),
            })
    }

    /// Validate a bearer token and return the caller it authorizes.
    pub fn validate(&self, token: &str) -> Result<OwnerId, AppError> {
        let claims = self.decode(token)?;
        tracing::trace!(owner_id = %claims.sub, jti = %claims.jti, "Validated bearer token");
        Ok(claims.owner_id())
    }
}

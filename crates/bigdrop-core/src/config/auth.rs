//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Bearer token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: u64,
    /// Value of the `iss` claim on issued tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_ttl_minutes: default_access_ttl(),
            issuer: default_issuer(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    60
}

fn default_issuer() -> String {
    "bigdrop".to_string()
}

//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `BIGDROP__*` environment variables. Each sub-module
//! represents a logical configuration section.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod storage;
pub mod transfer;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::storage::StorageConfig;
pub use self::transfer::TransferConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Registry backend settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Bearer token settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Chunk and archive storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Transfer limits and lifetimes.
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default.toml` with an environment-specific overlay
    /// (`config/{env}.toml`) and environment variables prefixed with
    /// `BIGDROP__`, e.g. `BIGDROP__AUTH__JWT_SECRET`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BIGDROP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the transfer engine cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        let transfer = &self.transfer;
        if transfer.max_chunk_size_bytes == 0 {
            return Err(AppError::configuration(
                "transfer.max_chunk_size_bytes must be greater than zero",
            ));
        }
        if transfer.max_transfer_size_bytes < transfer.max_chunk_size_bytes {
            return Err(AppError::configuration(
                "transfer.max_transfer_size_bytes must be at least one chunk",
            ));
        }
        if transfer.max_transfer_size_bytes > i64::MAX as u64 {
            return Err(AppError::configuration(
                "transfer.max_transfer_size_bytes does not fit a signed 64-bit size",
            ));
        }
        let max_chunks = transfer
            .max_transfer_size_bytes
            .div_ceil(transfer.max_chunk_size_bytes);
        if max_chunks > i32::MAX as u64 {
            return Err(AppError::configuration(format!(
                "transfer.max_chunk_size_bytes is too small: a maximal transfer would need \
                 {max_chunks} chunks (at most {})",
                i32::MAX
            )));
        }
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(AppError::configuration("auth.jwt_secret must not be empty"));
        }
        if !self.database.is_memory() && !self.database.provider.eq_ignore_ascii_case("postgres")
        {
            return Err(AppError::configuration(format!(
                "Unknown database.provider '{}'",
                self.database.provider
            )));
        }
        Ok(())
    }
}

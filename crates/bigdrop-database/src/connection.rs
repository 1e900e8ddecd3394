//! PostgreSQL connection pool.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use bigdrop_core::config::DatabaseConfig;
use bigdrop_core::error::{AppError, ErrorKind};
use bigdrop_core::result::AppResult;

/// Thin owner of the sqlx pool backing the transfer registry.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect using the pool sizing and timeouts from configuration.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        if config.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required for the postgres provider",
            ));
        }

        info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            "Connecting to transfer registry database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Borrow the sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Take the sqlx pool.
    pub fn into_pool(self) -> PgPool {
        self.pool
    }
}

/// Replace the password in a connection URL with `****`.
fn redact_url(url: &str) -> String {
    let Some(at) = url.rfind('@') else {
        return url.to_string();
    };
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url[scheme_end..at].find(':') {
        Some(colon) => format!("{}:****{}", &url[..scheme_end + colon], &url[at..]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_password_only() {
        assert_eq!(
            redact_url("postgres://bigdrop:s3cret@db:5432/bigdrop"),
            "postgres://bigdrop:****@db:5432/bigdrop"
        );
        assert_eq!(
            redact_url("postgres://db:5432/bigdrop"),
            "postgres://db:5432/bigdrop"
        );
        assert_eq!(
            redact_url("postgres://bigdrop@db/bigdrop"),
            "postgres://bigdrop@db/bigdrop"
        );
    }

    #[tokio::test]
    async fn empty_url_is_a_configuration_error() {
        let config = DatabaseConfig::default();
        let err = DatabasePool::connect(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}

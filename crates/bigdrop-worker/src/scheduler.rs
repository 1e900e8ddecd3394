//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use bigdrop_core::config::WorkerConfig;
use bigdrop_core::error::AppError;

use crate::jobs::TransferReaper;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Reaper run on every tick of the reaper schedule
    reaper: Arc<TransferReaper>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(reaper: Arc<TransferReaper>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, reaper })
    }

    /// Register all default scheduled tasks
    pub async fn register_default_tasks(&self, config: &WorkerConfig) -> Result<(), AppError> {
        self.register_reaper(&config.reaper_schedule).await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Transfer reaper, on the configured schedule
    async fn register_reaper(&self, schedule: &str) -> Result<(), AppError> {
        let reaper = Arc::clone(&self.reaper);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let reaper = Arc::clone(&reaper);
            Box::pin(async move {
                match reaper.run(Utc::now()).await {
                    Ok(report) => tracing::debug!(?report, "Reaper run finished"),
                    Err(e) => tracing::error!("Reaper run failed: {}", e),
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid reaper schedule '{schedule}': {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add reaper schedule: {e}")))?;

        tracing::info!(schedule, "Registered: transfer_reaper");
        Ok(())
    }
}

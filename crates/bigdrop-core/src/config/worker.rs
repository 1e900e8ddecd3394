//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Reaper scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression for the reaper job.
    #[serde(default = "default_reaper_schedule")]
    pub reaper_schedule: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reaper_schedule: default_reaper_schedule(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reaper_schedule() -> String {
    "0 */15 * * * *".to_string()
}

//! Scheduled maintenance for BigDrop.
//!
//! This crate provides:
//! - A cron scheduler that drives periodic jobs
//! - The transfer reaper, which reclaims storage held by dead transfers

pub mod jobs;
pub mod scheduler;

pub use jobs::TransferReaper;
pub use scheduler::CronScheduler;

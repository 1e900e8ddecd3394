//! Transfer reaper: reclaims storage held by transfers nobody can use anymore.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use bigdrop_core::config::TransferConfig;
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::TransferId;
use bigdrop_database::repositories::{ReapCutoffs, TransferRepository};
use bigdrop_entity::transfer::TransferState;
use bigdrop_service::{AssemblyEngine, TransferRegistry};
use bigdrop_storage::ChunkStore;

/// Outcome of one reaper run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Transfers removed with their chunks and archive.
    pub removed: usize,
    /// Stalled assemblies returned to uploading.
    pub reverted: usize,
    /// Chunk directories without a live upload behind them.
    pub orphans: usize,
    /// Transfers that could not be processed this run.
    pub failed: usize,
}

/// Deletes cancelled, idle and long-expired transfers.
///
/// Correctness never depends on this job: expiry is applied on every read.
/// It only reclaims space and unsticks assemblies cut short by a restart.
pub struct TransferReaper {
    repo: Arc<dyn TransferRepository>,
    registry: Arc<TransferRegistry>,
    assembly: Arc<AssemblyEngine>,
    chunks: ChunkStore,
    config: TransferConfig,
}

impl std::fmt::Debug for TransferReaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferReaper").finish()
    }
}

impl TransferReaper {
    /// Create a new reaper
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        registry: Arc<TransferRegistry>,
        assembly: Arc<AssemblyEngine>,
        chunks: ChunkStore,
        config: TransferConfig,
    ) -> Self {
        Self {
            repo,
            registry,
            assembly,
            chunks,
            config,
        }
    }

    fn idle_window(&self) -> Duration {
        Duration::hours(self.config.upload_session_ttl_hours as i64)
    }

    /// Run one pass as of `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<ReapReport> {
        tracing::info!("Running transfer reaper");
        let mut report = ReapReport::default();

        let cutoffs = ReapCutoffs {
            idle_before: now - self.idle_window(),
            expired_before: now - Duration::hours(self.config.expired_retention_hours as i64),
        };
        for transfer in self.repo.find_reapable(&cutoffs).await? {
            match self.registry.purge(&transfer).await {
                Ok(true) => {
                    tracing::debug!(transfer_id = %transfer.id, state = %transfer.state, "Reaped transfer");
                    report.removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to reap transfer {}: {}", transfer.id, e);
                    report.failed += 1;
                }
            }
        }

        for transfer in self
            .repo
            .find_stalled_assemblies(cutoffs.idle_before)
            .await?
        {
            match self.assembly.recover_stalled(&transfer).await {
                Ok(true) => report.reverted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to revert assembly of {}: {}", transfer.id, e);
                    report.failed += 1;
                }
            }
        }

        for id in self.chunks.transfer_ids().await? {
            match self.sweep_orphan(id, now).await {
                Ok(true) => report.orphans += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to sweep chunks of {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            removed = report.removed,
            reverted = report.reverted,
            orphans = report.orphans,
            failed = report.failed,
            "Transfer reaper finished"
        );
        Ok(report)
    }

    /// Drop a chunk directory whose transfer can no longer take uploads.
    async fn sweep_orphan(&self, id: TransferId, now: DateTime<Utc>) -> AppResult<bool> {
        let orphaned = match self.repo.find_by_id(id).await? {
            None => true,
            Some(transfer) => {
                let state = transfer.effective_state(now);
                if state.is_terminal() {
                    true
                } else {
                    state == TransferState::Ready && !self.config.retain_chunks_after_assembly
                }
            }
        };
        if orphaned {
            self.chunks.purge(id).await?;
        }
        Ok(orphaned)
    }
}

#[cfg(test)]
mod tests {
    use bigdrop_core::traits::storage::StorageProvider;
    use bigdrop_core::types::id::OwnerId;
    use bigdrop_database::repositories::MemoryTransferRepository;
    use bigdrop_entity::transfer::Transfer;
    use bigdrop_service::TransferServices;
    use bigdrop_service::transfer::CreateTransfer;
    use bigdrop_service::RequestContext;
    use bigdrop_storage::LocalStorageProvider;
    use bytes::Bytes;

    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        repo: Arc<dyn TransferRepository>,
        services: TransferServices,
        chunks: ChunkStore,
        reaper: TransferReaper,
        ctx: RequestContext,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let provider: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(dir.path()).await.unwrap());
        let repo: Arc<dyn TransferRepository> = Arc::new(MemoryTransferRepository::new());
        let config = TransferConfig {
            max_chunk_size_bytes: 4,
            ..Default::default()
        };
        let services = TransferServices::build(
            repo.clone(),
            provider.clone(),
            "_chunks",
            "_archives",
            config.clone(),
        );
        let chunks = ChunkStore::new(provider, "_chunks");
        let reaper = TransferReaper::new(
            repo.clone(),
            services.registry.clone(),
            services.assembly.clone(),
            chunks.clone(),
            config,
        );
        Fixture {
            _dir: dir,
            repo,
            services,
            chunks,
            reaper,
            ctx: RequestContext::new(OwnerId::new()),
        }
    }

    async fn uploading(f: &Fixture) -> Transfer {
        let t = f
            .services
            .registry
            .create(
                &f.ctx,
                CreateTransfer {
                    size: 8,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        f.services
            .uploads
            .put_chunk(&f.ctx, t.id, 0, Bytes::from("abcd"))
            .await
            .unwrap();
        f.repo.find_by_id(t.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn removes_cancelled_and_idle_but_keeps_active() {
        let f = fixture().await;
        let active = uploading(&f).await;
        let cancelled = uploading(&f).await;
        f.services.registry.cancel(&f.ctx, cancelled.id).await.unwrap();
        let mut idle = uploading(&f).await;
        idle.last_activity_at = Utc::now() - Duration::hours(5);
        f.repo.insert(&idle).await.unwrap();

        let report = f.reaper.run(Utc::now()).await.unwrap();
        assert_eq!(report.removed, 2);
        assert_eq!(report.failed, 0);

        assert!(f.repo.find_by_id(active.id).await.unwrap().is_some());
        assert!(f.repo.find_by_id(cancelled.id).await.unwrap().is_none());
        assert!(f.repo.find_by_id(idle.id).await.unwrap().is_none());
        assert!(f.chunks.stored_indices(idle.id, 2).await.unwrap().is_empty());
        assert_eq!(f.chunks.stored_indices(active.id, 2).await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn removes_transfers_past_retention() {
        let f = fixture().await;
        let mut recent = uploading(&f).await;
        recent.expires_at = Utc::now() - Duration::hours(1);
        f.repo.insert(&recent).await.unwrap();
        let mut old = uploading(&f).await;
        old.expires_at = Utc::now() - Duration::hours(30);
        f.repo.insert(&old).await.unwrap();

        let report = f.reaper.run(Utc::now()).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(f.repo.find_by_id(old.id).await.unwrap().is_none());
        assert!(f.repo.find_by_id(recent.id).await.unwrap().is_some());
        // chunks of an expired upload are useless even inside the retention window
        assert_eq!(report.orphans, 1);
        assert!(f.chunks.stored_indices(recent.id, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reverts_stalled_assembly() {
        let f = fixture().await;
        let t = uploading(&f).await;
        let long_ago = Utc::now() - Duration::hours(6);
        f.repo
            .transition(t.id, TransferState::Uploading, TransferState::Assembling, long_ago)
            .await
            .unwrap();

        let report = f.reaper.run(Utc::now()).await.unwrap();
        assert_eq!(report.reverted, 1);
        let stored = f.repo.find_by_id(t.id).await.unwrap().unwrap();
        assert_eq!(stored.state, TransferState::Uploading);
    }

    #[tokio::test]
    async fn sweeps_chunk_dirs_without_a_record() {
        let f = fixture().await;
        let stray = TransferId::new();
        f.chunks.put(stray, 0, Bytes::from("lost")).await.unwrap();
        let live = uploading(&f).await;

        let report = f.reaper.run(Utc::now()).await.unwrap();
        assert_eq!(report.orphans, 1);
        assert!(f.chunks.stored_indices(stray, 1).await.unwrap().is_empty());
        assert_eq!(f.chunks.stored_indices(live.id, 2).await.unwrap(), vec![0]);
    }
}

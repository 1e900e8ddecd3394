//! BigDrop Server: chunked upload, archive assembly and public downloads.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use bigdrop_auth::{JwtDecoder, JwtEncoder};
use bigdrop_core::config::AppConfig;
use bigdrop_core::error::AppError;
use bigdrop_core::traits::storage::StorageProvider;
use bigdrop_core::types::id::OwnerId;
use bigdrop_service::TransferServices;
use bigdrop_storage::{ChunkStore, LocalStorageProvider};
use bigdrop_worker::jobs::TransferReaper;
use bigdrop_worker::scheduler::CronScheduler;

/// BigDrop transfer server.
#[derive(Debug, Parser)]
#[command(name = "bigdrop-server", version, about)]
struct Cli {
    /// Configuration environment overlay (`config/{env}.toml`).
    #[arg(long, env = "BIGDROP_ENV", default_value = "development")]
    env: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print a bearer token for an owner, for testing and scripted clients.
    IssueToken {
        /// Owner id; a fresh one is generated when omitted.
        #[arg(long)]
        owner: Option<OwnerId>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_logging(&config);
            run(config).await
        }
        Command::IssueToken { owner } => issue_token(&config, owner.unwrap_or_default()),
    };

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        eprintln!("{e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

fn issue_token(config: &AppConfig, owner: OwnerId) -> Result<(), AppError> {
    let issued = JwtEncoder::new(&config.auth).issue(owner)?;
    println!("owner_id:     {owner}");
    println!("expires_at:   {}", issued.expires_at.to_rfc3339());
    println!("access_token: {}", issued.access_token);
    Ok(())
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting BigDrop v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Storage ──────────────────────────────────────────
    tracing::info!(data_root = %config.storage.data_root, "Initializing storage...");
    let storage: Arc<dyn StorageProvider> =
        Arc::new(LocalStorageProvider::new(&config.storage.data_root).await?);

    // ── Step 2: Transfer registry ────────────────────────────────
    tracing::info!(provider = %config.database.provider, "Opening transfer registry...");
    let repo = bigdrop_database::open_transfer_repository(&config.database).await?;

    // ── Step 3: Services ─────────────────────────────────────────
    let services = TransferServices::build(
        Arc::clone(&repo),
        Arc::clone(&storage),
        &config.storage.chunk_prefix,
        &config.storage.archive_prefix,
        config.transfer.clone(),
    );

    // ── Step 4: Background reaper ────────────────────────────────
    let mut scheduler = if config.worker.enabled {
        let reaper = Arc::new(TransferReaper::new(
            Arc::clone(&repo),
            Arc::clone(&services.registry),
            Arc::clone(&services.assembly),
            ChunkStore::new(Arc::clone(&storage), config.storage.chunk_prefix.clone()),
            config.transfer.clone(),
        ));

        match reaper.run(chrono::Utc::now()).await {
            Ok(report) => tracing::info!(?report, "Startup reaper pass finished"),
            Err(e) => tracing::warn!("Startup reaper pass failed: {}", e),
        }

        let scheduler = CronScheduler::new(reaper).await?;
        scheduler.register_default_tasks(&config.worker).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 5: Build and start HTTP server ──────────────────────
    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = bigdrop_api::AppState::new(Arc::new(config), jwt_decoder, storage, services);
    let app = bigdrop_api::build_app(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("BigDrop server listening on {}", addr);

    // ── Step 6: Graceful shutdown ────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }

    tracing::info!("BigDrop server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

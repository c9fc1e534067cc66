//! llog API server binary.
//!
//! Wires environment configuration, structured logging, the Postgres
//! stores, the background refresh worker, and the HTTP router, then
//! serves until the process is stopped.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use governor::{Quota, RateLimiter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use llog_api::{build_router, AppState};
use llog_core::{
    defaults, FolderStore, FolderTreeStore, ItemStore, JobQueue, MetadataBackend, OriginFetcher,
};
use llog_db::{Database, PoolConfig};
use llog_inference::OpenAIBackend;
use llog_jobs::{RefreshHandler, WorkerBuilder, WorkerConfig};
use llog_notion::NotionClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "llog_api=debug,tower_http=debug".into());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();

    // Keep the appender guard alive for the life of the process so
    // buffered log lines are flushed on exit.
    let _file_guard = if let Ok(log_file) = std::env::var("LOG_FILE") {
        let path = std::path::Path::new(&log_file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "llog-api.log".to_string());
        let appender = tracing_appender::rolling::daily(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        if log_format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
        }
        Some(guard)
    } else if log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
        None
    } else {
        let ansi = std::env::var("LOG_ANSI")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(ansi)
            .init();
        None
    };

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);
    let rate_limit_requests = std::env::var("RATE_LIMIT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(defaults::RATE_LIMIT_REQUESTS);
    let rate_limit_period = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(defaults::RATE_LIMIT_PERIOD_SECS);
    let rate_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(Duration::from_secs(rate_limit_period))
            .expect("Rate limit period must be non-zero")
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32).expect("Rate limit must be non-zero"),
            );
        info!(
            "Rate limiting enabled: {} requests per {} seconds",
            rate_limit_requests, rate_limit_period
        );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        info!("Rate limiting disabled");
        None
    };

    let database_url = std::env::var("DATABASE_URL")?;
    info!("Connecting to database");
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env()).await?;
    info!("Running migrations");
    db.migrate().await?;
    info!("Migrations complete");

    let Database {
        items,
        folders,
        folder_tree,
        jobs,
        ..
    } = db;
    let items: Arc<dyn ItemStore> = Arc::new(items);
    let folders: Arc<dyn FolderStore> = Arc::new(folders);
    let folder_tree: Arc<dyn FolderTreeStore> = Arc::new(folder_tree);
    let jobs: Arc<dyn JobQueue> = Arc::new(jobs);

    let metadata: Option<Arc<dyn MetadataBackend>> = match OpenAIBackend::from_env() {
        Ok(backend) => {
            info!("Metadata backend ready: {}", backend.model_name());
            Some(Arc::new(backend))
        }
        Err(e) => {
            warn!("Metadata backend unavailable: {}", e);
            None
        }
    };

    let worker_config = WorkerConfig::from_env();
    let _worker_handle = if worker_config.enabled {
        match NotionClient::from_env() {
            Ok(client) => {
                let fetcher: Arc<dyn OriginFetcher> = Arc::new(client);
                let worker = WorkerBuilder::new(jobs.clone())
                    .with_config(worker_config)
                    .with_handler(RefreshHandler::new(items.clone(), fetcher))
                    .build()
                    .await;
                let handle = worker.start();
                info!("Job worker started");
                Some(handle)
            }
            Err(e) => {
                warn!("Job worker disabled: Notion client unavailable: {}", e);
                None
            }
        }
    } else {
        info!("Job worker disabled");
        None
    };

    let state = AppState {
        items,
        folders,
        folder_tree,
        jobs,
        metadata,
        rate_limiter,
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

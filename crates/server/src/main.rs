//! The `vkv-server` binary: loads configuration, wires the configured
//! backends to an [`Orchestrator`], spawns the async worker, and serves the
//! HTTP adapter.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vkv_core::{KvStore, MetadataStore, Queue};
use vkv_engine::Orchestrator;
use vkv_storage::{EnvelopeKvStore, InMemoryKvStore, InMemoryMetadataStore, InMemoryQueue};
use vkv_worker::Worker;

use config::{BackendKind, Config};

/// A versioned key-value store server.
#[derive(Parser, Debug)]
#[command(name = "vkv-server", version)]
struct Cli {
    /// Path to a TOML configuration file. Missing is not an error; every
    /// key defaults.
    #[arg(long, default_value = "vkv.toml")]
    config: PathBuf,
}

/// Read-path dataset cache lifetime (spec Design Notes: "~10s").
const DATASET_CACHE_TTL: Duration = Duration::from_secs(10);

fn build_metadata_store(config: &config::StoreConfig) -> anyhow::Result<Arc<dyn MetadataStore>> {
    match config.kind {
        BackendKind::InMemory => Ok(Arc::new(InMemoryMetadataStore::new())),
        BackendKind::RemoteDocStore => {
            let client = vkv_remote::RemoteDocStoreClient::new(config.remote_config())?;
            Ok(Arc::new(vkv_remote::RemoteMetadataStore::new(client)))
        }
    }
}

fn build_kv_store(config: &config::StoreConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    match config.kind {
        BackendKind::InMemory => {
            let store = InMemoryKvStore::new();
            if config.compress {
                Ok(Arc::new(EnvelopeKvStore::new(store, true)))
            } else {
                Ok(Arc::new(store))
            }
        }
        BackendKind::RemoteDocStore => {
            let client = vkv_remote::RemoteDocStoreClient::new(config.remote_config())?;
            Ok(Arc::new(vkv_remote::RemoteKvStore::new(client)))
        }
    }
}

fn build_queue(config: &config::QueueConfig) -> anyhow::Result<Arc<dyn Queue>> {
    match config.kind {
        BackendKind::InMemory => Ok(Arc::new(InMemoryQueue::new(config.lease_time()))),
        BackendKind::RemoteDocStore => {
            let client = vkv_remote::RemoteDocStoreClient::new(config.remote_config())?;
            Ok(Arc::new(vkv_remote::RemoteQueue::new(client, config.lease_time())))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let metadata = build_metadata_store(&config.meta_data_store)?;
    let kv = build_kv_store(&config.kv_store)?;
    let queue = build_queue(&config.queue)?;

    let orchestrator = Arc::new(Orchestrator::new(
        metadata.clone(),
        kv.clone(),
        queue.clone(),
        DATASET_CACHE_TTL,
    ));

    let worker = Arc::new(
        Worker::new(metadata, kv, queue, config.async_task.operations_topic.clone())
            .with_poll_interval(config.async_task.poll_interval()),
    );
    tracing::info!(pid = worker.pid(), "starting async worker");
    let stop_handle = worker.stop_handle();
    let worker_handle = worker.spawn();

    let router = vkv_http::router(orchestrator);
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down async worker");
    stop_handle.stop();
    worker_handle
        .join()
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

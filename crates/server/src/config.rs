//! Configuration surface (spec §6): a TOML file of recognized keys. Unknown
//! keys and tables are ignored rather than rejected — `serde` simply never
//! sees them unless a struct below names the field.

use std::time::Duration;

use serde::Deserialize;

/// Which concrete backend a store section selects.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// The in-process reference implementation (`vkv-storage`).
    InMemory,
    /// The remote document-store client (`vkv-remote`).
    RemoteDocStore,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::InMemory
    }
}

/// `kv-store.*` / `meta-data-store.*`: backend selection plus the
/// connection details a remote backend needs. Ignored entirely when
/// `type = "in-memory"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StoreConfig {
    /// `in-memory` or `remote-doc-store`.
    #[serde(rename = "type")]
    pub kind: BackendKind,
    /// Remote document-store base URL.
    pub endpoint: Option<String>,
    /// Remote document-store logical region/partition.
    pub region: Option<String>,
    /// Per-request timeout against the remote document store, in seconds.
    pub timeout_secs: Option<u64>,
    /// Enable the bincode+zstd envelope codec on top of an in-memory KV
    /// store. Ignored for `meta-data-store` and for remote backends.
    pub compress: bool,
}

impl StoreConfig {
    /// Build the [`vkv_remote::RemoteConfig`] this section describes.
    pub fn remote_config(&self) -> vkv_remote::RemoteConfig {
        let mut remote = vkv_remote::RemoteConfig::default();
        if let Some(endpoint) = &self.endpoint {
            remote.endpoint = endpoint.clone();
        }
        remote.region = self.region.clone();
        if let Some(secs) = self.timeout_secs {
            remote.timeout = Duration::from_secs(secs);
        }
        remote
    }
}

/// `queue.*`: backend selection plus the lease duration reservations hold
/// for before becoming eligible for redelivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct QueueConfig {
    /// `in-memory` or `remote-doc-store`.
    #[serde(rename = "type")]
    pub kind: BackendKind,
    /// Remote document-store base URL.
    pub endpoint: Option<String>,
    /// Remote document-store logical region/partition.
    pub region: Option<String>,
    /// Per-request timeout against the remote document store, in seconds.
    pub timeout_secs: Option<u64>,
    /// How long a reservation holds a message before it is eligible for
    /// redelivery, in seconds.
    pub lease_time_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            kind: BackendKind::InMemory,
            endpoint: None,
            region: None,
            timeout_secs: None,
            lease_time_secs: 30,
        }
    }
}

impl QueueConfig {
    /// Build the [`vkv_remote::RemoteConfig`] this section describes.
    pub fn remote_config(&self) -> vkv_remote::RemoteConfig {
        let mut remote = vkv_remote::RemoteConfig::default();
        if let Some(endpoint) = &self.endpoint {
            remote.endpoint = endpoint.clone();
        }
        remote.region = self.region.clone();
        if let Some(secs) = self.timeout_secs {
            remote.timeout = Duration::from_secs(secs);
        }
        remote
    }

    /// Lease duration as a [`Duration`].
    pub fn lease_time(&self) -> Duration {
        Duration::from_secs(self.lease_time_secs)
    }
}

/// `server.*`: the HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerConfig {
    /// TCP port the HTTP adapter binds.
    pub port: u16,
    /// Path prefix every route is mounted under. Reserved; the current
    /// router always mounts at `/`.
    pub context_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8089,
            context_root: String::new(),
        }
    }
}

/// `async-task.*`: the background worker loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AsyncTaskConfig {
    /// How long the worker sleeps after an empty reserve before retrying, in
    /// milliseconds.
    pub poll_interval_ms: u64,
    /// The topic the orchestrator enqueues operations on and the worker
    /// reserves from.
    pub operations_topic: String,
    /// Name of the handler entry point. Reserved for a future
    /// pluggable-handler mechanism; the shipped worker always dispatches by
    /// `Action` and ignores this key.
    pub handler_fn: Option<String>,
}

impl Default for AsyncTaskConfig {
    fn default() -> Self {
        AsyncTaskConfig {
            poll_interval_ms: vkv_worker::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            operations_topic: vkv_engine::OPERATIONS_TOPIC.to_string(),
            handler_fn: None,
        }
    }
}

impl AsyncTaskConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `logging.*`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig {
    /// A `tracing-subscriber` `EnvFilter` directive, e.g. `"info"` or
    /// `"vkv_engine=debug,info"`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// The full recognized configuration surface. Every section is optional and
/// defaults apply independently — an empty file is a valid, fully-defaulted
/// configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// `server.*`.
    pub server: ServerConfig,
    /// `async-task.*`.
    pub async_task: AsyncTaskConfig,
    /// `kv-store.*`.
    pub kv_store: StoreConfig,
    /// `meta-data-store.*`.
    pub meta_data_store: StoreConfig,
    /// `queue.*`.
    pub queue: QueueConfig,
    /// `logging.*`.
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration file. A missing file is not an error —
    /// defaults apply — but a present, malformed one is.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        Ok(config)
    }
}

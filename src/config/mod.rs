use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub use crate::nats::NatsConfig;
use crate::pipeline::Partition;
use crate::state::EvictionPolicy;

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Source/sink wiring and worker pool sizing
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Application identity; also the durable consumer name shared by replicas
    #[serde(default = "default_application_id")]
    pub application_id: String,
    /// Subject filter for raw position reports
    #[serde(default = "default_source_subject")]
    pub source_subject: String,
    /// Enriched events are published to `{sink_subject_prefix}.{vehicle_id}`
    #[serde(default = "default_sink_subject_prefix")]
    pub sink_subject_prefix: String,
    /// Number of enrichment workers (vehicles are hashed onto workers)
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-worker queue depth
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Number of processes splitting the vehicle id space
    #[serde(default = "default_partition_count")]
    pub partition_count: u32,
    /// Which slice this process owns, in `0..partition_count`
    #[serde(default)]
    pub partition_index: u32,
}

fn default_application_id() -> String {
    "rtd-stream".to_string()
}

fn default_source_subject() -> String {
    "rtd.position.raw.>".to_string()
}

fn default_sink_subject_prefix() -> String {
    "rtd.position.enriched".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_partition_count() -> u32 {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            application_id: default_application_id(),
            source_subject: default_source_subject(),
            sink_subject_prefix: default_sink_subject_prefix(),
            workers: default_workers(),
            channel_capacity: default_channel_capacity(),
            partition_count: default_partition_count(),
            partition_index: 0,
        }
    }
}

impl PipelineConfig {
    pub fn partition(&self) -> anyhow::Result<Partition> {
        Partition::new(self.partition_index, self.partition_count)
    }
}

/// Position state retention
///
/// Without `ttl_seconds` the store keeps one entry per vehicle ever seen,
/// so memory grows with the number of distinct vehicle ids.
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Drop a vehicle's position after this long without a report
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    /// How often the eviction sweep runs when a TTL is set
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: None,
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl StateConfig {
    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::from_ttl_seconds(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// How often to log a metrics snapshot (seconds)
    #[serde(default = "default_report_interval")]
    pub report_interval_seconds: u64,
}

fn default_report_interval() -> u64 {
    30
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_seconds: default_report_interval(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load configuration if the file exists, defaults otherwise
pub fn load_config_or_default(
    path: impl AsRef<Path>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        Ok(AppConfig::default())
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WaymarkConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub filter: FilterConfig,
    pub pause: PauseConfig,
    pub events: EventsConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Sample validation and rate-limiting thresholds.
///
/// The rate gate uses the `tracking_*` pair while a session is actively
/// tracking and the stricter `idle_*` pair otherwise; both are multiplied by
/// the battery factors below the matching charge level.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    /// Samples older than this are stale and rejected.
    pub max_sample_age_secs: i64,
    /// Horizontal accuracy above this rejects the fix outright.
    pub max_accuracy_m: f64,
    /// Accuracy above this marks a fix "poor" and bypasses the rate gate.
    pub poor_accuracy_m: f64,
    pub tracking_min_interval_secs: i64,
    pub tracking_min_distance_m: f64,
    pub idle_min_interval_secs: i64,
    pub idle_min_distance_m: f64,
    /// Rate-gate multiplier below `low_battery_level`.
    pub low_battery_rate_factor: f64,
    /// Rate-gate multiplier below `critical_battery_level`.
    pub critical_battery_rate_factor: f64,
    pub low_battery_level: f64,
    pub critical_battery_level: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PauseConfig {
    /// Displacement that counts as significant movement.
    pub min_movement_m: f64,
    /// Seconds without significant movement before the session is paused.
    pub idle_timeout_secs: i64,
}

/// Automatic memory-creation thresholds, scaled by battery level.
///
/// A sample triggers an automatic memory when it is at least the distance
/// threshold away from the last significant sample OR at least the interval
/// threshold later. Scarcer energy means fewer automatic memories.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EventsConfig {
    pub min_distance_m: f64,
    pub min_interval_secs: i64,
    pub reduced_distance_m: f64,
    pub reduced_interval_secs: i64,
    pub low_distance_m: f64,
    pub low_interval_secs: i64,
    /// Below this level the `reduced_*` thresholds apply.
    pub reduced_battery_level: f64,
    /// Below this level the `low_*` thresholds apply.
    pub low_battery_level: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum pending events held offline; further enqueues are rejected.
    pub capacity: usize,
    /// Entries kept by the low-memory trim.
    pub trim_keep: usize,
}

impl Default for WaymarkConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            filter: FilterConfig::default(),
            pause: PauseConfig::default(),
            events: EventsConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_waymark_dir()
            .join("waymark.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_sample_age_secs: 60,
            max_accuracy_m: 100.0,
            poor_accuracy_m: 100.0,
            tracking_min_interval_secs: 10,
            tracking_min_distance_m: 10.0,
            idle_min_interval_secs: 30,
            idle_min_distance_m: 25.0,
            low_battery_rate_factor: 2.0,
            critical_battery_rate_factor: 3.0,
            low_battery_level: 0.3,
            critical_battery_level: 0.2,
        }
    }
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            min_movement_m: 5.0,
            idle_timeout_secs: 300,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            min_distance_m: 100.0,
            min_interval_secs: 600,
            reduced_distance_m: 200.0,
            reduced_interval_secs: 900,
            low_distance_m: 500.0,
            low_interval_secs: 1800,
            reduced_battery_level: 0.6,
            low_battery_level: 0.3,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            trim_keep: 10,
        }
    }
}

/// Returns `~/.waymark/`
pub fn default_waymark_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".waymark")
}

/// Returns the default config file path: `~/.waymark/config.toml`
pub fn default_config_path() -> PathBuf {
    default_waymark_dir().join("config.toml")
}

impl WaymarkConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            WaymarkConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (WAYMARK_DB, WAYMARK_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WAYMARK_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("WAYMARK_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

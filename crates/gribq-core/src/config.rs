use crate::cycle::CycleSchedule;
use crate::geo::LongitudeConvention;
use crate::retrieve::{FetchPolicy, RetryPolicy};
use crate::storage::BackupPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per URL (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 5.0,
            max_delay_secs: 60,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: Duration::try_from_secs_f64(cfg.base_delay_secs)
                .unwrap_or(Duration::ZERO),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    /// Minimum seconds between two requests of one session.
    pub rate_limit_secs: u64,
    /// Hard bound on one fetch session.
    pub session_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            rate_limit_secs: 10,
            session_timeout_secs: 600,
        }
    }
}

/// Default area when `fetch` gets no location flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Box height in degrees of latitude.
    pub height: f64,
    /// Box width in degrees of longitude.
    pub width: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            height: 10.0,
            width: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    pub max_count: u32,
    pub extension: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            max_count: 5,
            extension: ".bak".to_string(),
        }
    }
}

/// Global configuration loaded from `~/.config/gribq/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GribqConfig {
    /// Root of the run folders; XDG data dir when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    pub model: String,
    pub product: String,
    /// Preset used when `fetch` is given none.
    #[serde(default)]
    pub preset: Option<String>,
    pub forecast_hour: u32,
    pub cycle_interval_hours: u32,
    pub max_lookback_hours: u32,
    /// Hours after the cycle time before a run is worth asking for.
    #[serde(default)]
    pub availability_delay_hours: u32,
    #[serde(default)]
    pub longitude_convention: LongitudeConvention,
    /// Extra model definition files, registered after the built-in ones.
    #[serde(default)]
    pub model_files: Vec<PathBuf>,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub backup: BackupConfig,
}

impl Default for GribqConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            model: "gfs".to_string(),
            product: "gfs_0p25".to_string(),
            preset: None,
            forecast_hour: 0,
            cycle_interval_hours: 6,
            max_lookback_hours: 18,
            availability_delay_hours: 0,
            longitude_convention: LongitudeConvention::default(),
            model_files: Vec::new(),
            location: LocationConfig::default(),
            http: HttpConfig::default(),
            retry: None,
            backup: BackupConfig::default(),
        }
    }
}

impl GribqConfig {
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            retry: self
                .retry
                .as_ref()
                .map(RetryPolicy::from)
                .unwrap_or_default(),
            rate_limit: Duration::from_secs(self.http.rate_limit_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            session_timeout: Duration::from_secs(self.http.session_timeout_secs),
        }
    }

    pub fn cycle_schedule(&self) -> CycleSchedule {
        CycleSchedule {
            interval_hours: self.cycle_interval_hours,
            max_lookback_hours: self.max_lookback_hours,
            availability_delay_hours: self.availability_delay_hours,
        }
    }

    pub fn backup_policy(&self) -> BackupPolicy {
        BackupPolicy {
            max_count: self.backup.max_count,
            extension: self.backup.extension.clone(),
        }
    }

    /// `output_dir`, or `~/.local/share/gribq/runs` when unset.
    pub fn resolved_output_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.output_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("gribq")?;
        Ok(xdg_dirs.get_data_home().join("runs"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gribq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GribqConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<GribqConfig> {
    if !path.exists() {
        let default_cfg = GribqConfig::default();
        save_to(&default_cfg, path)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: GribqConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

pub fn save(cfg: &GribqConfig) -> Result<()> {
    save_to(cfg, &config_path()?)
}

pub fn save_to(cfg: &GribqConfig, path: &Path) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("write config {}", path.display()))?;
    Ok(())
}

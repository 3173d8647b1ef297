//! Configuration management for live-capture.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{CaptureConfig, JobConfig, ProbeConfig, SupervisorConfig, ToolsConfig},
};

use live_capture_core::{CaptureSettings, JobSpec, ToolPaths};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output layout.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// External executables.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Availability probe.
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Supervision timings.
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    /// Jobs registered at startup.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

impl Config {
    /// Load configuration from `path`, or from the platform config directory.
    ///
    /// A missing file is replaced by a freshly written default.
    #[track_caller]
    #[instrument]
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config = Self::parse(&contents)?;

            info!(config_path = ?config_path, jobs = config.jobs.len(), "Configuration loaded");

            Ok(config)
        } else {
            info!(config_path = ?config_path, "No config found, creating default");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Parse TOML text into a configuration.
    #[track_caller]
    pub fn parse(contents: &str) -> AppResult<Self> {
        toml::from_str(contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Reject values the supervisor cannot work with.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate(&self) -> AppResult<()> {
        let reason = if self.capture.segment_time == 0 {
            "capture.segment_time must be greater than zero".to_string()
        } else if self.extension().is_empty() {
            "capture.extension must not be empty".to_string()
        } else if self.tools.fetcher.as_os_str().is_empty() {
            "tools.fetcher must not be empty".to_string()
        } else if self.tools.segmenter.as_os_str().is_empty() {
            "tools.segmenter must not be empty".to_string()
        } else if let Some(job) = self
            .jobs
            .iter()
            .find(|job| job.name.trim().is_empty() || job.url.trim().is_empty())
        {
            format!("job {:?} needs both a name and a url", job.name)
        } else {
            return Ok(());
        };

        Err(AppError::ConfigError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Supervisor settings derived from this configuration.
    pub fn to_settings(&self) -> CaptureSettings {
        CaptureSettings {
            mode: self.capture.mode,
            segment_time: Duration::from_secs(self.capture.segment_time),
            extension: self.extension().to_string(),
            tools: ToolPaths {
                fetcher: self.tools.fetcher.clone(),
                segmenter: self.tools.segmenter.clone(),
                quality: self.tools.quality.clone(),
            },
            probe_timeout: Duration::from_secs(self.probe.timeout_secs),
            probe_strictness: self.probe.strictness,
            grace_period: Duration::from_secs(self.supervisor.grace_period_secs),
            watch_interval: Duration::from_millis(self.supervisor.watch_interval_ms),
            join_timeout: Duration::from_millis(self.supervisor.join_timeout_ms),
        }
    }

    fn extension(&self) -> &str {
        self.capture.extension.trim().trim_start_matches('.')
    }

    /// Job spec for `job`, falling back to the default output root.
    pub fn job_spec(&self, job: &JobConfig) -> JobSpec {
        let output_root = job
            .output_dir
            .clone()
            .unwrap_or_else(|| self.capture.output_root.clone());

        JobSpec {
            name: job.name.clone(),
            url: job.url.clone(),
            output_root,
            mode: job.mode,
        }
    }

    /// Save configuration to `config_path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                debug!(config_dir = ?parent, "Created config directory");
            }
        }

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Directory for the log file.
    #[track_caller]
    pub fn log_dir() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("logs"))
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "live-capture", "Live-Capture").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }
}

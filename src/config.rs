//! Configuration system using Figment.
//!
//! Strongly-typed configuration loading for a measurement run. Configuration
//! is loaded from:
//! 1. A `stallwatch.toml` file (base configuration)
//! 2. Environment variables (prefixed with `STALLWATCH_`)
//!
//! # Example
//! ```no_run
//! use stallwatch::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! println!("Stall threshold: {} ms", config.experiment.stall_threshold_ms);
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Experiment phase and stall-detection settings
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Competing bulk-transfer settings
    #[serde(default)]
    pub injector: InjectorConfig,
    /// Measurement log output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Experiment phase and stall-detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Inter-frame gap above which a frame counts as a stall, in milliseconds
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold_ms: f64,
    /// Quiescent observation window before the competing load starts
    #[serde(default = "default_baseline_duration")]
    pub baseline_duration_sec: u64,
    /// Observation window during which the competing load runs
    #[serde(default = "default_attack_duration")]
    pub attack_duration_sec: u64,
}

/// Competing bulk-transfer (load injector) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectorConfig {
    /// Number of parallel TCP flows
    #[serde(default = "default_flow_count")]
    pub flow_count: u32,
    /// Congestion control algorithm for the competing flows
    #[serde(default = "default_congestion_control")]
    pub congestion_control: String,
    /// Address of the bulk-transfer server the flows connect to
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Port of the bulk-transfer server
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// How long the orchestrator waits for launch confirmation before
    /// declaring the Attack phase failed, in milliseconds
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_ms: u64,
    /// Bulk-transfer client binary
    #[serde(default = "default_injector_binary")]
    pub binary: String,
}

/// Measurement log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for the measurement log and run artifacts
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// Bounded flush interval for the buffered measurement log, in
    /// milliseconds (0 = flush on every record)
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,
}

// Default value functions
fn default_app_name() -> String {
    "stallwatch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stall_threshold() -> f64 {
    100.0
}

fn default_baseline_duration() -> u64 {
    15
}

fn default_attack_duration() -> u64 {
    30
}

fn default_flow_count() -> u32 {
    10
}

fn default_congestion_control() -> String {
    "bbr".to_string()
}

fn default_server_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    5202
}

fn default_launch_timeout() -> u64 {
    3000
}

fn default_injector_binary() -> String {
    "iperf3".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_flush_interval() -> u64 {
    1000
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            stall_threshold_ms: default_stall_threshold(),
            baseline_duration_sec: default_baseline_duration(),
            attack_duration_sec: default_attack_duration(),
        }
    }
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            flow_count: default_flow_count(),
            congestion_control: default_congestion_control(),
            server_addr: default_server_addr(),
            port: default_server_port(),
            launch_timeout_ms: default_launch_timeout(),
            binary: default_injector_binary(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            flush_interval_ms: default_flush_interval(),
        }
    }
}

impl Config {
    /// Load configuration from `stallwatch.toml` and environment variables.
    ///
    /// Environment variables can override configuration with prefix STALLWATCH_
    /// Example: STALLWATCH_EXPERIMENT_BASELINE_DURATION_SEC=5
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("stallwatch.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("STALLWATCH_").split("_"))
            .extract()
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if !self.experiment.stall_threshold_ms.is_finite()
            || self.experiment.stall_threshold_ms <= 0.0
        {
            return Err(format!(
                "Invalid stall_threshold_ms {}. Must be a positive number",
                self.experiment.stall_threshold_ms
            ));
        }

        if self.experiment.baseline_duration_sec == 0 {
            return Err("baseline_duration_sec must be greater than 0".to_string());
        }
        if self.experiment.attack_duration_sec == 0 {
            return Err("attack_duration_sec must be greater than 0".to_string());
        }

        if self.injector.flow_count == 0 {
            return Err("flow_count must be greater than 0".to_string());
        }

        let valid_cc = ["bbr", "cubic", "reno"];
        if !valid_cc.contains(&self.injector.congestion_control.as_str()) {
            return Err(format!(
                "Invalid congestion_control '{}'. Must be one of: {}",
                self.injector.congestion_control,
                valid_cc.join(", ")
            ));
        }

        Ok(())
    }

    /// Baseline phase duration.
    pub fn baseline_duration(&self) -> Duration {
        Duration::from_secs(self.experiment.baseline_duration_sec)
    }

    /// Attack phase duration.
    pub fn attack_duration(&self) -> Duration {
        Duration::from_secs(self.experiment.attack_duration_sec)
    }

    /// Measurement log flush interval.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.output.flush_interval_ms)
    }

    /// Injector launch confirmation timeout.
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.injector.launch_timeout_ms)
    }
}

//! Configuration using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/hessio.toml` (or any file passed to [`HessioConfig::load_from`])
//! 2. Environment variables prefixed with `RUST_HESSIO_`, nested with `__`
//!
//! Every section has defaults, so an absent file yields a usable configuration.
//!
//! # Example
//! ```no_run
//! use rust_hessio::config::HessioConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // RUST_HESSIO_INGEST__MAX_EVENTS=100 overrides [ingest] max_events
//! let config = HessioConfig::load()?;
//! config.validate()?;
//! println!("Export format: {}", config.export.format);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::dump::DumpLevel;
use crate::error::{AppResult, HessioError};
use crate::export::SinkRegistry;
use crate::ingest::IngestOptions;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/hessio.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "RUST_HESSIO_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HessioConfig {
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Triggered events to read over all inputs; 0 or absent reads everything.
    #[serde(default)]
    pub max_events: Option<u64>,
    #[serde(default)]
    pub dump_level: DumpLevel,
    /// Pixels printed per telescope by the event dump.
    #[serde(default = "default_max_print_pixels")]
    pub max_print_pixels: usize,
}

/// Table export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Sink format, one of [`SinkRegistry::list_formats`]
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Array layout selected at the first event of each run.
    #[serde(default)]
    pub name: Option<String>,
    /// TOML file with the `[layouts.<name>]` reference table.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

fn default_name() -> String {
    "rust_hessio".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_print_pixels() -> usize {
    10
}

fn default_enabled() -> bool {
    true
}

fn default_format() -> String {
    "csv".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("hessio_tables")
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_events: None,
            dump_level: DumpLevel::default(),
            max_print_pixels: default_max_print_pixels(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            format: default_format(),
            output_dir: default_output_dir(),
        }
    }
}

impl HessioConfig {
    /// Load configuration from `config/hessio.toml` and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path. A missing file is not an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::figment(path).extract()?)
    }

    /// The provider stack behind [`HessioConfig::load_from`].
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(HessioError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(HessioError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        if self.export.enabled {
            let registry = SinkRegistry::new();
            if !registry.is_available(&self.export.format) {
                return Err(HessioError::Configuration(format!(
                    "Export format '{}' is not available. Available: {}",
                    self.export.format,
                    registry.list_formats().join(", ")
                )));
            }
        }

        if self.ingest.max_print_pixels == 0 {
            return Err(HessioError::Configuration(
                "max_print_pixels must be at least 1".to_string(),
            ));
        }

        if self.layout.name.is_some() && self.layout.catalog.is_none() {
            return Err(HessioError::Configuration(
                "A layout name requires a layout catalog file".to_string(),
            ));
        }

        Ok(())
    }

    /// Ingestion options derived from this configuration.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_events: self.ingest.max_events.filter(|n| *n > 0),
            layout: self.layout.name.clone(),
        }
    }
}

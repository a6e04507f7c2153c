//! CLI configuration and settings management

use crate::{CliError, Result};
use clap::ValueEnum;
use ct_core::pretty::PrettyOptions;
use ct_instrument::{InstrumentConfig, PASS_NAME};
use ct_pipeline::{OptimizationLevel, PipelineOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCAL_CONFIG: &str = "casttrace.toml";

/// CLI configuration loaded from config files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Instrumentation settings
    pub instrument: InstrumentSettings,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSettings {
    /// Symbol called before every instrumented cast
    pub hook_name: String,

    /// Optimization level the pipeline is built for
    pub opt_level: OptimizationLevel,

    /// Verify the module after every pass
    pub verify_each: bool,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            hook_name: PASS_NAME.to_string(),
            opt_level: OptimizationLevel::O0,
            verify_each: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmitFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default format for emitted modules
    pub format: EmitFormat,

    /// Annotate textual output with result types
    pub show_types: bool,

    /// Indent size of textual output
    pub indent_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: EmitFormat::Json,
            show_types: true,
            indent_size: 4,
        }
    }
}

impl CliConfig {
    /// Load configuration from `config_path`, or from the first standard
    /// location that holds a config file, falling back to defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                debug!("using configuration {}", candidate.display());
                return Self::load_from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Standard locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".casttrace.toml"));
        }
        if let Some(path) = Self::default_config_path() {
            paths.push(path);
        }
        paths
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| CliError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("casttrace").join("config.toml"))
    }

    pub fn instrument_config(&self) -> InstrumentConfig {
        InstrumentConfig::default().with_hook_name(self.instrument.hook_name.clone())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions::default()
            .with_opt_level(self.instrument.opt_level)
            .with_verify_each(self.instrument.verify_each)
    }

    pub fn pretty_options(&self) -> PrettyOptions {
        PrettyOptions {
            indent_size: self.output.indent_size,
            show_types: self.output.show_types,
            ..PrettyOptions::default()
        }
    }
}

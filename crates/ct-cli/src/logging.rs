//! Log output for the `casttrace` binary.
//!
//! Logs always go to stderr; stdout is reserved for the emitted module.

use clap::ValueEnum;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{CliError, Result};

/// Crates whose spans and events follow the verbosity flags.
const CASTTRACE_TARGETS: [&str; 4] = ["ct_cli", "ct_core", "ct_pipeline", "ct_instrument"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging flags as given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSettings {
    pub verbose: u8,
    pub quiet: bool,
    pub level: Option<LogLevel>,
    pub format: LogFormat,
}

impl LogSettings {
    /// Level applied to the casttrace crates, or `None` when no flag asked
    /// for one and `RUST_LOG` may decide.
    pub fn requested_level(&self) -> Option<LogLevel> {
        if let Some(level) = self.level {
            return Some(level);
        }
        if self.quiet {
            return Some(LogLevel::Error);
        }
        match self.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }

    /// Filter directive for the requested level. Dependencies stay at `warn`
    /// unless the level is stricter than that.
    pub fn directive(&self) -> String {
        let level = self.requested_level().unwrap_or(LogLevel::Warn);
        if matches!(level, LogLevel::Error | LogLevel::Warn) {
            return level.as_str().to_string();
        }
        let mut directive = String::from("warn");
        for target in CASTTRACE_TARGETS {
            directive.push_str(&format!(",{}={}", target, level.as_str()));
        }
        directive
    }

    fn filter(&self) -> Result<EnvFilter> {
        if self.requested_level().is_none() {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        EnvFilter::try_new(self.directive())
            .map_err(|err| CliError::Config(format!("invalid log filter: {}", err)))
    }

    /// Installs the global subscriber. Fails if one is already installed.
    pub fn init(&self) -> Result<()> {
        let filter = self.filter()?;
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(tracing_subscriber::fmt::time::uptime());

        let installed = match self.format {
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(layer)
                .with(filter)
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(layer.json())
                .with(filter)
                .try_init(),
        };
        installed.map_err(|err| CliError::Config(format!("cannot install logger: {}", err)))
    }
}

//! casttrace CLI Binary
//!
//! Inserts a call to a weak, no-op hook before every pointer-to-pointer
//! `bitcast` whose source is not a stack allocation.
//!
//! # Usage
//!
//! ```bash
//! # Instrument a module, writing JSON to stdout
//! casttrace instrument alloc.json
//!
//! # Render the result as text, built for O2, with a custom hook
//! casttrace instrument alloc.json --emit text -O 2 --hook-name __cast_trace
//!
//! # List the casts that would be hooked
//! casttrace inspect alloc.json
//!
//! # Check a module for structural problems
//! casttrace verify alloc.json
//! ```

use clap::{Parser, Subcommand};
use ct_cli::{
    cli::CliConfig,
    commands::{
        self, inspect::InspectArgs, instrument::InstrumentArgs, verify::VerifyArgs,
    },
    diagnostics::{render_cli_error, setup_error_reporting},
    logging::{LogFormat, LogLevel, LogSettings},
    Result,
};
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Parser)]
#[command(
    name = "casttrace",
    version = env!("CARGO_PKG_VERSION"),
    about = "casttrace: hook every heap pointer cast with its destination type",
    long_about = r#"
casttrace instruments pointer-to-pointer bitcasts. Each cast whose source is
not a stack allocation is preceded by a call to a weak, no-op hook receiving
the source pointer and the name of the destination pointee type. Link a
strong definition of the hook to observe the casts at run time.

EXAMPLES:
    casttrace instrument alloc.json -o alloc.instrumented.json
    casttrace instrument alloc.json --emit text
    casttrace inspect alloc.json
    casttrace verify alloc.json
    "#
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log more to stderr; repeat for debug and trace output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level for the casttrace crates, overriding -v and -q
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Format of the log lines
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Instrument a module and emit the result
    Instrument(InstrumentArgs),

    /// List the casts that would be instrumented
    Inspect(InspectArgs),

    /// Check a module for structural problems
    Verify(VerifyArgs),
}

impl Cli {
    fn log_settings(&self) -> LogSettings {
        LogSettings {
            verbose: self.verbose,
            quiet: self.quiet,
            level: self.log,
            format: self.log_format,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_error_reporting()?;
    cli.log_settings().init()?;

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| {
        debug!(hook = %config.instrument.hook_name, "configuration loaded");
        match cli.command {
            Commands::Instrument(args) => commands::instrument_command(args, &config),
            Commands::Inspect(args) => commands::inspect_command(args, &config),
            Commands::Verify(args) => commands::verify_command(args, &config),
        }
    });

    if let Err(err) = result {
        if !render_cli_error(&err) {
            error!("{}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}

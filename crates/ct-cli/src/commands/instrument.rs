//! Instrument command implementation

use crate::cli::{CliConfig, EmitFormat};
use crate::Result;
use clap::Args;
use ct_core::diagnostics::{DiagnosticDisplayOptions, DiagnosticManager};
use ct_core::io::{module_to_json, read_module};
use ct_core::pretty::pretty;
use ct_instrument::{register_passes, PASS_NAME};
use ct_pipeline::{run_module_pipeline, OptimizationLevel, PassRegistry, PipelineDiagnostics};
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments for the instrument command
#[derive(Debug, Clone, Args)]
pub struct InstrumentArgs {
    /// Module to instrument (JSON)
    pub input: PathBuf,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub emit: Option<EmitFormat>,

    /// Optimization level the pipeline is built for (0-3)
    #[arg(short = 'O', long = "opt-level")]
    pub opt_level: Option<OptimizationLevel>,

    /// Symbol of the hook called before every instrumented cast
    #[arg(long)]
    pub hook_name: Option<String>,
}

/// Execute the instrument command
pub fn instrument_command(args: InstrumentArgs, config: &CliConfig) -> Result<()> {
    let module = read_module(&args.input)?;

    let mut instrument = config.instrument_config();
    if let Some(hook_name) = args.hook_name {
        instrument = instrument.with_hook_name(hook_name);
    }
    let mut options = config.pipeline_options();
    if let Some(level) = args.opt_level {
        options = options.with_opt_level(level);
    }

    let mut registry = PassRegistry::new();
    register_passes(&mut registry, instrument);

    let mut diagnostics = PipelineDiagnostics::default();
    let unit = match run_module_pipeline(module, &registry, &options, &mut diagnostics) {
        Ok(unit) => unit,
        Err(err) => {
            DiagnosticManager::emit(
                &diagnostics.items,
                Some(err.stage),
                &DiagnosticDisplayOptions::pretty(options.debug.verbose),
            );
            return Err(err.into());
        }
    };
    debug!(
        "'{}' ran {} time(s) on module '{}'",
        PASS_NAME,
        unit.report.ran(PASS_NAME),
        unit.module.name
    );

    let rendered = match args.emit.unwrap_or(config.output.format) {
        EmitFormat::Json => module_to_json(&unit.module)?,
        EmitFormat::Text => pretty(&unit.module, config.pretty_options()).to_string(),
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            info!("wrote instrumented module to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

//! Verify command implementation

use crate::cli::CliConfig;
use crate::{CliError, Result};
use clap::Args;
use console::style;
use ct_core::diagnostics::{DiagnosticDisplayOptions, DiagnosticManager};
use ct_core::io::read_module;
use ct_core::lir::verify::verify_module;
use std::path::PathBuf;

/// Arguments for the verify command
#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// Module to check (JSON)
    pub input: PathBuf,

    /// Print diagnostics without decoration
    #[arg(long)]
    pub plain: bool,
}

/// Execute the verify command
pub fn verify_command(args: VerifyArgs, _config: &CliConfig) -> Result<()> {
    let module = read_module(&args.input)?;
    let diagnostics = verify_module(&module);

    let options = if args.plain {
        DiagnosticDisplayOptions::plain(true)
    } else {
        DiagnosticDisplayOptions::pretty(true)
    };
    DiagnosticManager::emit(&diagnostics, Some("verify"), &options);

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        return Err(CliError::Verification {
            module: module.name,
            errors,
        });
    }

    println!("{} module '{}' is well-formed", style("✓").green(), module.name);
    Ok(())
}

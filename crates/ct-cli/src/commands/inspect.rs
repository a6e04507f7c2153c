//! Inspect command implementation

use crate::cli::CliConfig;
use crate::Result;
use clap::Args;
use console::style;
use ct_core::io::read_module;
use ct_instrument::find_module_casts;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Arguments for the inspect command
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Module to inspect (JSON)
    pub input: PathBuf,

    /// Hook whose own body is left out of the listing
    #[arg(long)]
    pub hook_name: Option<String>,
}

/// List the casts `instrument` would hook, without modifying anything
pub fn inspect_command(args: InspectArgs, config: &CliConfig) -> Result<()> {
    let module = read_module(&args.input)?;
    let hook_name = args
        .hook_name
        .unwrap_or_else(|| config.instrument.hook_name.clone());

    let casts = find_module_casts(&module, &hook_name);
    let mut type_strings = BTreeSet::new();
    for cast in &casts {
        println!(
            "@{} bb{} %r{}: {} -> {}*",
            cast.function, cast.block, cast.instruction, cast.source_ty, cast.pointee
        );
        type_strings.insert(module.type_string(&cast.pointee));
    }

    println!(
        "{} eligible cast(s), {} distinct type string(s) in module '{}'",
        style(casts.len()).bold(),
        style(type_strings.len()).bold(),
        module.name
    );
    Ok(())
}

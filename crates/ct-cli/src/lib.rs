//! Command-line front end for the cast instrumentation pass.
//!
//! Modules are read and written as JSON; `--emit text` renders them in the
//! LLVM-like textual form instead.

pub mod cli;
pub mod commands;
pub mod diagnostics;
pub mod logging;

pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CliError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error(transparent)]
        Module(#[from] ct_core::Error),

        #[error("Pipeline error: {0}")]
        Pipeline(#[from] ct_pipeline::PipelineError),

        #[error("module '{module}' failed verification with {errors} error(s)")]
        Verification { module: String, errors: usize },

        #[error("Invalid input: {0}")]
        InvalidInput(String),
    }

    pub type Result<T> = std::result::Result<T, CliError>;
}

pub use error::{CliError, Result};

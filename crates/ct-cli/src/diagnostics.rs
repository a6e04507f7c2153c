//! Diagnostic and error reporting utilities

use crate::{CliError, Result};
use miette::Diagnostic;
use thiserror::Error;

/// Set up enhanced error reporting with miette
pub fn setup_error_reporting() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .map_err(|e| CliError::Config(format!("Failed to setup error reporting: {}", e)))?;

    Ok(())
}

/// User-facing report for a failed command
#[derive(Error, Debug, Diagnostic)]
pub enum CastTraceError {
    #[error("{message}")]
    #[diagnostic(
        code(casttrace::input),
        help("input modules are JSON documents as written by `casttrace instrument --emit json`")
    )]
    Input { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(casttrace::verify),
        help("run `casttrace verify <INPUT>` to list every problem")
    )]
    Malformed { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(casttrace::pipeline),
        help("a function already using the hook name must have type void (i8*, i8*); pick another name with --hook-name")
    )]
    Pipeline { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(casttrace::config),
        help("check casttrace.toml (or the file given with --config) for correct syntax and values")
    )]
    Config { message: String },
}

impl CastTraceError {
    pub fn from_cli_error(err: &CliError) -> Option<Self> {
        let message = err.to_string();
        match err {
            CliError::Config(_) => Some(Self::Config { message }),
            CliError::Module(ct_core::Error::Verification(_)) | CliError::Verification { .. } => {
                Some(Self::Malformed { message })
            }
            CliError::Module(_) | CliError::InvalidInput(_) => Some(Self::Input { message }),
            CliError::Pipeline(pipeline) if pipeline.is_verification() => {
                Some(Self::Malformed { message })
            }
            CliError::Pipeline(_) => Some(Self::Pipeline { message }),
            CliError::Io(_) => None,
        }
    }
}

/// Renders `err` through miette. Returns false when it has no rich form and
/// should be logged instead.
pub fn render_cli_error(err: &CliError) -> bool {
    match CastTraceError::from_cli_error(err) {
        Some(report) => {
            eprintln!("{:?}", miette::Report::new(report));
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_pipeline::PipelineError;

    #[test]
    fn test_pipeline_errors_are_classified_by_stage() {
        let malformed = CliError::Pipeline(PipelineError::new("verify", "bad block"));
        assert!(matches!(
            CastTraceError::from_cli_error(&malformed),
            Some(CastTraceError::Malformed { .. })
        ));

        let conflict = CliError::Pipeline(PipelineError::new("casttrace", "hook clash"));
        match CastTraceError::from_cli_error(&conflict) {
            Some(CastTraceError::Pipeline { message }) => assert!(message.contains("hook clash")),
            other => panic!("expected pipeline report, got {:?}", other),
        }
    }

    #[test]
    fn test_io_errors_have_no_rich_report() {
        let err = CliError::Io(std::io::Error::new(std::io::ErrorKind::Other, "gone"));
        assert!(CastTraceError::from_cli_error(&err).is_none());
    }
}

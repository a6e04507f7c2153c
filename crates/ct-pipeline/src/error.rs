use crate::config::PipelineOptions;
use ct_core::diagnostics::{Diagnostic, DiagnosticDisplayOptions, DiagnosticManager};
use thiserror::Error;

/// Diagnostics collected while a stage runs. Flushed to stderr after every
/// successful stage; left in place when a stage fails so the caller can show
/// what led up to the failure.
#[derive(Debug, Default, Clone)]
pub struct PipelineDiagnostics {
    pub items: Vec<Diagnostic>,
}

impl PipelineDiagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn flush(&mut self, stage: &str, options: &PipelineOptions) {
        if self.items.is_empty() {
            return;
        }
        let display = DiagnosticDisplayOptions::pretty(options.debug.verbose);
        DiagnosticManager::emit(&self.items, Some(stage), &display);
        self.items.clear();
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// A stage that refused to hand its module on.
#[derive(Debug, Error)]
#[error("[{stage}] {message}")]
pub struct PipelineError {
    pub stage: &'static str,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Errors raised by the verifier rather than by a pass.
    pub fn is_verification(&self) -> bool {
        self.stage == crate::standard::VERIFY_STAGE
    }
}

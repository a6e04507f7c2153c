use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::lir::{BasicBlockId, LirId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Where in a module a diagnostic points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrLocation {
    pub function: Option<String>,
    pub block: Option<BasicBlockId>,
    pub instruction: Option<LirId>,
}

impl IrLocation {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            function: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn in_block(mut self, block: BasicBlockId) -> Self {
        self.block = Some(block);
        self
    }

    pub fn at_instruction(mut self, id: LirId) -> Self {
        self.instruction = Some(id);
        self
    }
}

impl Display for IrLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts = [
            self.function.as_ref().map(|name| format!("@{}", name)),
            self.block.map(|id| format!("bb{}", id)),
            self.instruction.map(|id| format!("%r{}", id)),
        ];
        write!(f, "{}", parts.into_iter().flatten().join(" "))
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub location: Option<IrLocation>,
    pub suggestions: Vec<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            location: None,
            suggestions: Vec::new(),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_location(mut self, location: IrLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            write!(f, " (hints: {})", self.suggestions.join("; "))?;
        }

        Ok(())
    }
}

/// Built-in templates supported by the diagnostic manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticTemplate {
    Pretty,
    Plain,
}

/// Runtime configuration for emitting diagnostics.
#[derive(Debug, Clone)]
pub struct DiagnosticDisplayOptions {
    pub template: DiagnosticTemplate,
    pub verbose_info: bool,
}

impl DiagnosticDisplayOptions {
    pub fn pretty(verbose_info: bool) -> Self {
        Self {
            template: DiagnosticTemplate::Pretty,
            verbose_info,
        }
    }

    pub fn plain(verbose_info: bool) -> Self {
        Self {
            template: DiagnosticTemplate::Plain,
            verbose_info,
        }
    }
}

impl Default for DiagnosticDisplayOptions {
    fn default() -> Self {
        DiagnosticDisplayOptions::pretty(false)
    }
}

pub struct DiagnosticManager;

impl DiagnosticManager {
    /// Render diagnostics to lines. The fallback context is used when a
    /// diagnostic does not carry its own.
    pub fn render(
        diagnostics: &[Diagnostic],
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) -> Vec<String> {
        diagnostics
            .iter()
            .filter(|diagnostic| {
                diagnostic.level != DiagnosticLevel::Info || options.verbose_info
            })
            .flat_map(|diagnostic| {
                let context = fallback_context.unwrap_or("pipeline");
                match options.template {
                    DiagnosticTemplate::Pretty => render_pretty(diagnostic, context),
                    DiagnosticTemplate::Plain => render_plain(diagnostic, context),
                }
            })
            .collect()
    }

    pub fn emit(
        diagnostics: &[Diagnostic],
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) {
        for line in Self::render(diagnostics, fallback_context, options) {
            eprintln!("{}", line);
        }
    }
}

fn render_pretty(diagnostic: &Diagnostic, context: &str) -> Vec<String> {
    let prefix = match diagnostic.level {
        DiagnosticLevel::Error => "error",
        DiagnosticLevel::Warning => "warning",
        DiagnosticLevel::Info => "note",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!("{}[{}]: {} ({})", prefix, context, diagnostic.message, code),
        None => format!("{}[{}]: {}", prefix, context, diagnostic.message),
    };

    let mut lines = vec![header];
    if let Some(location) = &diagnostic.location {
        lines.push(format!("  --> {}", location));
    }
    for suggestion in &diagnostic.suggestions {
        lines.push(format!("  = help: {}", suggestion));
    }
    lines
}

fn render_plain(diagnostic: &Diagnostic, context: &str) -> Vec<String> {
    let level = match diagnostic.level {
        DiagnosticLevel::Error => "ERROR",
        DiagnosticLevel::Warning => "WARNING",
        DiagnosticLevel::Info => "INFO",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!("[{}] {}: {} ({})", context, level, diagnostic.message, code),
        None => format!("[{}] {}: {}", context, level, diagnostic.message),
    };

    let mut lines = vec![header];
    if let Some(location) = &diagnostic.location {
        lines.push(format!("   at {}", location));
    }
    for suggestion in &diagnostic.suggestions {
        lines.push(format!("   suggestion: {}", suggestion));
    }
    lines
}

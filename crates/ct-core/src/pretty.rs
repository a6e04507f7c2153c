//! Textual rendering of modules in an LLVM-like syntax.

use std::fmt::{self, Formatter};

#[derive(Debug, Clone)]
pub struct PrettyOptions {
    /// Spaces per nesting level.
    pub indent_size: usize,
    /// Append `!dbg file:line:col` to instructions that carry a location.
    pub show_debug_info: bool,
    /// Append result types to instructions when known.
    pub show_types: bool,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            show_debug_info: false,
            show_types: true,
        }
    }
}

/// Printer state threaded through nested `fmt_pretty` calls.
pub struct PrettyCtx<'a> {
    pub options: &'a PrettyOptions,
    depth: usize,
}

impl<'a> PrettyCtx<'a> {
    pub fn new(options: &'a PrettyOptions) -> Self {
        Self { options, depth: 0 }
    }

    /// Writes one line at the current depth.
    pub fn writeln(&self, f: &mut Formatter<'_>, line: impl AsRef<str>) -> fmt::Result {
        let width = self.depth * self.options.indent_size;
        writeln!(f, "{:width$}{}", "", line.as_ref(), width = width)
    }

    /// Runs `body` one level deeper.
    pub fn nested<F>(&mut self, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }
}

pub trait PrettyPrintable {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result;
}

/// `Display` adapter returned by [`pretty`].
pub struct PrettyDisplay<'a, T> {
    value: &'a T,
    options: PrettyOptions,
}

impl<T: PrettyPrintable> fmt::Display for PrettyDisplay<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.value.fmt_pretty(f, &mut PrettyCtx::new(&self.options))
    }
}

pub fn pretty<T: PrettyPrintable>(value: &T, options: PrettyOptions) -> PrettyDisplay<'_, T> {
    PrettyDisplay { value, options }
}

/// Escapes bytes for a `c"..."` literal the way LLVM prints them: printable
/// ASCII stays as is, everything else becomes `\XX`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        if byte.is_ascii_graphic() && byte != b'"' && byte != b'\\' || byte == b' ' {
            out.push(byte as char);
        } else {
            let _ = write!(out, "\\{:02X}", byte);
        }
    }
    out
}

//! Core IR, diagnostics and errors shared by the casttrace crates.

pub mod diagnostics;
pub mod error;
pub mod io;
pub mod lir;
pub mod pretty;

pub use error::{Error, Result};

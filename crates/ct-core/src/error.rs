use std::result;

use itertools::Itertools;
use thiserror::Error;

use crate::diagnostics::Diagnostic;

#[derive(Error, Debug)]
pub enum Error {
    #[error("module verification failed: {}", .0.iter().join("; "))]
    Verification(Vec<Diagnostic>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed module: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Verification(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

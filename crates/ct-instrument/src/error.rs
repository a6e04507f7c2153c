use ct_pipeline::PipelineError;
use thiserror::Error;

use crate::PASS_NAME;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("function @{name} already exists with type {found}, expected void (i8*, i8*)")]
    HookConflict { name: String, found: String },
    #[error("@{name} is already a global variable and cannot be used as the hook")]
    HookNameTaken { name: String },
    #[error("hook name must not be empty")]
    EmptyHookName,
}

impl From<InstrumentError> for PipelineError {
    fn from(err: InstrumentError) -> Self {
        PipelineError::new(PASS_NAME, err.to_string())
    }
}

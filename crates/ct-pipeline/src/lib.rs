//! Module pass scheduling: extension points, a typed stage pipeline and the
//! standard verify/pass/verify sequence.

pub mod config;
pub mod error;
pub mod pass;
pub mod pipeline;
pub mod standard;

pub use config::{DebugOptions, OptimizationLevel, PipelineOptions};
pub use error::{PipelineDiagnostics, PipelineError};
pub use pass::{ExtensionPoint, ModulePass, PassRegistry};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineStage};
pub use standard::{build_module_pipeline, run_module_pipeline, ModuleUnit, PassRecord, PipelineReport};

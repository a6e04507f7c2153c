//! The standard module pipeline: verify, the registered passes, verify again.

use crate::config::PipelineOptions;
use crate::error::{PipelineDiagnostics, PipelineError};
use crate::pass::{ModulePass, PassRegistry};
use crate::pipeline::{Pipeline, PipelineBuilder, PipelineStage};
use ct_core::diagnostics::{Diagnostic, DiagnosticLevel};
use ct_core::lir::verify::verify_module;
use ct_core::lir::LirModule;
use itertools::Itertools;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    pub name: &'static str,
    pub changed: bool,
}

/// What happened to a module while it went through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub passes: Vec<PassRecord>,
}

impl PipelineReport {
    pub fn changed(&self) -> bool {
        self.passes.iter().any(|record| record.changed)
    }

    pub fn ran(&self, name: &str) -> usize {
        self.passes.iter().filter(|record| record.name == name).count()
    }
}

/// A module travelling through the pipeline together with its report.
#[derive(Debug, Clone)]
pub struct ModuleUnit {
    pub module: LirModule,
    pub report: PipelineReport,
}

impl ModuleUnit {
    pub fn new(module: LirModule) -> Self {
        Self {
            module,
            report: PipelineReport::default(),
        }
    }
}

pub const VERIFY_STAGE: &str = "verify";

pub struct VerifyStage;

impl PipelineStage for VerifyStage {
    type SrcCtx = ModuleUnit;
    type DstCtx = ModuleUnit;

    fn name(&self) -> &'static str {
        VERIFY_STAGE
    }

    fn run(
        &self,
        context: ModuleUnit,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<ModuleUnit, PipelineError> {
        let found = verify_module(&context.module);
        let errors = found
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
            .map(ToString::to_string)
            .collect_vec();
        diagnostics.extend(found);
        if !errors.is_empty() {
            return Err(PipelineError::new(
                self.name(),
                format!(
                    "module '{}' is malformed: {}",
                    context.module.name,
                    errors.join("; ")
                ),
            ));
        }
        Ok(context)
    }
}

pub struct ModulePassStage {
    pass: Box<dyn ModulePass>,
}

impl ModulePassStage {
    pub fn new(pass: Box<dyn ModulePass>) -> Self {
        Self { pass }
    }
}

impl PipelineStage for ModulePassStage {
    type SrcCtx = ModuleUnit;
    type DstCtx = ModuleUnit;

    fn name(&self) -> &'static str {
        self.pass.name()
    }

    fn run(
        &self,
        mut context: ModuleUnit,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<ModuleUnit, PipelineError> {
        let changed = self.pass.run_on_module(&mut context.module)?;
        debug!(
            "pass '{}' finished on module '{}' (changed: {})",
            self.pass.name(),
            context.module.name,
            changed
        );
        diagnostics.push(Diagnostic::info(format!(
            "{} modified module '{}': {}",
            self.pass.name(),
            context.module.name,
            changed
        )));
        context.report.passes.push(PassRecord {
            name: self.pass.name(),
            changed,
        });
        Ok(context)
    }
}

pub fn build_module_pipeline(
    registry: &PassRegistry,
    options: &PipelineOptions,
) -> Pipeline<ModuleUnit, ModuleUnit> {
    let mut builder = PipelineBuilder::<ModuleUnit, ModuleUnit>::new().add_stage(VerifyStage);
    let passes = registry.passes_for(options.opt_level);
    let scheduled = passes.len();
    for pass in passes {
        builder = builder.add_stage(ModulePassStage::new(pass));
        if options.verify_each {
            builder = builder.add_stage(VerifyStage);
        }
    }
    if !options.verify_each && scheduled > 0 {
        builder = builder.add_stage(VerifyStage);
    }
    builder.build()
}

/// Builds the standard pipeline for `options` and pushes `module` through it.
pub fn run_module_pipeline(
    module: LirModule,
    registry: &PassRegistry,
    options: &PipelineOptions,
    diagnostics: &mut PipelineDiagnostics,
) -> Result<ModuleUnit, PipelineError> {
    let pipeline = build_module_pipeline(registry, options);
    info!(
        "running pipeline at {} on module '{}': {}",
        options.opt_level,
        module.name,
        pipeline.stages().join(" -> ")
    );
    pipeline.run(ModuleUnit::new(module), diagnostics, options)
}

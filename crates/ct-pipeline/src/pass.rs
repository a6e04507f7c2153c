//! Module passes and the registry that schedules them.

use crate::config::OptimizationLevel;
use crate::error::PipelineError;
use ct_core::lir::LirModule;
use tracing::trace;

/// A transformation over a whole module.
///
/// Pass objects may be reused for several modules, so any per-module state
/// must live in a context created inside `run_on_module`.
pub trait ModulePass: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns whether the module was modified.
    fn run_on_module(&self, module: &mut LirModule) -> Result<bool, PipelineError>;
}

/// Places in the standard pipeline where extra passes can be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    /// Early in module-level optimization; only used when optimizing.
    ModuleOptimizerEarly,
    /// Runs when optimizations are disabled (O0).
    EnabledOnOptLevel0,
}

impl ExtensionPoint {
    pub fn is_active(self, level: OptimizationLevel) -> bool {
        match self {
            ExtensionPoint::ModuleOptimizerEarly => !level.is_disabled(),
            ExtensionPoint::EnabledOnOptLevel0 => level.is_disabled(),
        }
    }
}

type PassFactory = Box<dyn Fn() -> Box<dyn ModulePass> + Send + Sync>;

#[derive(Default)]
pub struct PassRegistry {
    extensions: Vec<(ExtensionPoint, PassFactory)>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a pass to an extension point. The factory is invoked once per
    /// built pipeline.
    pub fn register<F>(&mut self, point: ExtensionPoint, factory: F)
    where
        F: Fn() -> Box<dyn ModulePass> + Send + Sync + 'static,
    {
        self.extensions.push((point, Box::new(factory)));
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Instantiates the passes whose extension point is active at `level`,
    /// in registration order.
    pub fn passes_for(&self, level: OptimizationLevel) -> Vec<Box<dyn ModulePass>> {
        self.extensions
            .iter()
            .filter(|(point, _)| point.is_active(level))
            .map(|(point, factory)| {
                let pass = factory();
                trace!("scheduling '{}' at {:?} for {}", pass.name(), point, level);
                pass
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl ModulePass for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn run_on_module(&self, _module: &mut LirModule) -> Result<bool, PipelineError> {
            Ok(false)
        }
    }

    #[test]
    fn pass_registered_at_both_points_runs_once_per_level() {
        let mut registry = PassRegistry::new();
        registry.register(ExtensionPoint::ModuleOptimizerEarly, || Box::new(Noop));
        registry.register(ExtensionPoint::EnabledOnOptLevel0, || Box::new(Noop));

        for level in [
            OptimizationLevel::O0,
            OptimizationLevel::O1,
            OptimizationLevel::O2,
            OptimizationLevel::O3,
        ] {
            assert_eq!(registry.passes_for(level).len(), 1, "level {level}");
        }
    }

    #[test]
    fn early_extension_is_skipped_at_o0() {
        let mut registry = PassRegistry::new();
        registry.register(ExtensionPoint::ModuleOptimizerEarly, || Box::new(Noop));
        assert!(registry.passes_for(OptimizationLevel::O0).is_empty());
        assert_eq!(registry.passes_for(OptimizationLevel::O2).len(), 1);
    }
}

//! Cast-site instrumentation.
//!
//! Every pointer-to-pointer `bitcast` whose source is not a direct stack
//! allocation gets a call to a weak, no-op hook inserted right before it:
//!
//! ```text
//! call void @casttrace(i8* <source>, i8* <rendered destination pointee type>)
//! ```
//!
//! A runtime that wants to observe the casts links in a strong definition of
//! the hook. Argument 1 is the source pointer (possibly null); argument 2 is a
//! NUL-terminated string in static storage naming the destination pointee type.

pub mod config;
pub mod error;
pub mod hook;
pub mod instrumenter;
pub mod type_strings;

pub use config::InstrumentConfig;
pub use error::InstrumentError;
pub use hook::{ensure_hook, hook_signature, HookHandle, HookOrigin};
pub use instrumenter::{
    find_eligible_casts, find_module_casts, CastInstrumenter, EligibleCast, InstrumentStats,
    InstrumentationContext,
};
pub use type_strings::{read_type_string, GlobalStringHandle, TypeStringTable};

use ct_pipeline::{ExtensionPoint, PassRegistry};

/// Name of the pass, and the default name of the hook it calls.
pub const PASS_NAME: &str = "casttrace";

/// Registers the instrumentation early in module optimization and at O0, so
/// that it runs exactly once whatever the optimization level.
pub fn register_passes(registry: &mut PassRegistry, config: InstrumentConfig) {
    for point in [
        ExtensionPoint::ModuleOptimizerEarly,
        ExtensionPoint::EnabledOnOptLevel0,
    ] {
        let config = config.clone();
        registry.register(point, move || {
            Box::new(CastInstrumenter::new(config.clone())) as Box<dyn ct_pipeline::ModulePass>
        });
    }
}

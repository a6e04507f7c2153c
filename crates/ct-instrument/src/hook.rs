//! Synthesis of the per-module hook function.

use ct_core::lir::{
    CallingConvention, FunctionAttribute, LirBasicBlock, LirFunction, LirFunctionSignature,
    LirModule, LirTerminator, LirValue, Linkage, Ty,
};
use tracing::debug;

use crate::error::InstrumentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOrigin {
    /// The weak no-op default was added to the module.
    Created,
    /// A function with the hook's name and signature was already present.
    Reused,
}

/// The hook as resolved for one module visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookHandle {
    pub name: String,
    pub origin: HookOrigin,
}

impl HookHandle {
    pub fn callee(&self) -> LirValue {
        LirValue::Function(self.name.clone())
    }
}

/// `void (i8*, i8*)`
pub fn hook_signature() -> LirFunctionSignature {
    LirFunctionSignature {
        params: vec![Ty::i8_ptr(), Ty::i8_ptr()],
        return_type: Ty::Void,
        is_variadic: false,
    }
}

/// Makes sure `module` contains exactly one hook named `name`.
///
/// An existing function with the expected signature is reused untouched, so
/// calling this twice is harmless and a hand-written definition wins. Any
/// other symbol under that name is a conflict.
pub fn ensure_hook(module: &mut LirModule, name: &str) -> Result<HookHandle, InstrumentError> {
    if name.is_empty() {
        return Err(InstrumentError::EmptyHookName);
    }

    if let Some(existing) = module.get_function(name) {
        if existing.signature != hook_signature() {
            return Err(InstrumentError::HookConflict {
                name: name.to_string(),
                found: existing.function_type().to_string(),
            });
        }
        debug!(
            "reusing existing @{} in module '{}' (linkage {:?})",
            name, module.name, existing.linkage
        );
        return Ok(HookHandle {
            name: name.to_string(),
            origin: HookOrigin::Reused,
        });
    }

    if module.get_global(name).is_some() {
        return Err(InstrumentError::HookNameTaken {
            name: name.to_string(),
        });
    }

    module.add_function(default_hook(name));
    debug!("synthesized weak hook @{} in module '{}'", name, module.name);
    Ok(HookHandle {
        name: name.to_string(),
        origin: HookOrigin::Created,
    })
}

fn default_hook(name: &str) -> LirFunction {
    let mut hook = LirFunction::new(
        name,
        hook_signature(),
        CallingConvention::C,
        Linkage::WeakOdr,
    );
    hook.add_attribute(FunctionAttribute::NoInline);
    hook.add_attribute(FunctionAttribute::OptimizeNone);

    let mut entry = LirBasicBlock::new(0, Some(format!("{}_entry", name)));
    entry.set_terminator(LirTerminator::Return(None));
    hook.add_basic_block(entry);
    hook
}

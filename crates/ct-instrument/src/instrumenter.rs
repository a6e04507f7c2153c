use std::collections::HashMap;

use ct_core::lir::{
    BasicBlockId, CallingConvention, LirBasicBlock, LirFunction, LirId, LirInstruction,
    LirInstructionKind, LirModule, LirValue, Name, Ty,
};
use ct_pipeline::{ModulePass, PipelineError};
use tracing::{debug, info, info_span, trace};

use crate::config::InstrumentConfig;
use crate::error::InstrumentError;
use crate::hook::{ensure_hook, HookHandle, HookOrigin};
use crate::type_strings::TypeStringTable;
use crate::PASS_NAME;

/// A pointer-to-pointer `bitcast` that receives a hook call.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleCast {
    pub function: Name,
    pub block: BasicBlockId,
    pub instruction: LirId,
    pub source: LirValue,
    pub source_ty: Ty,
    /// What the cast's result points to.
    pub pointee: Ty,
}

enum Verdict {
    Eligible(EligibleCast),
    StackSourced,
    Ignored,
}

fn classify(
    module: &LirModule,
    func: &LirFunction,
    block: BasicBlockId,
    inst: &LirInstruction,
) -> Verdict {
    let LirInstructionKind::Bitcast(source, target) = &inst.kind else {
        return Verdict::Ignored;
    };
    let Some(pointee) = target.pointee() else {
        return Verdict::Ignored;
    };
    let Some(source_ty) = func
        .value_type(module, source)
        .filter(Ty::is_pointer)
    else {
        return Verdict::Ignored;
    };
    if func.is_stack_allocation(source) {
        return Verdict::StackSourced;
    }

    Verdict::Eligible(EligibleCast {
        function: func.name.clone(),
        block,
        instruction: inst.id,
        source: source.clone(),
        source_ty,
        pointee: pointee.clone(),
    })
}

/// Eligible casts of one block in program order. Nothing is modified.
pub fn find_eligible_casts(
    module: &LirModule,
    func: &LirFunction,
    block: &LirBasicBlock,
) -> Vec<EligibleCast> {
    block
        .instructions
        .iter()
        .filter_map(|inst| match classify(module, func, block.id, inst) {
            Verdict::Eligible(cast) => Some(cast),
            _ => None,
        })
        .collect()
}

/// Eligible casts of every function except the hook itself, whose body must
/// never call back into the hook.
pub fn find_module_casts(module: &LirModule, hook_name: &str) -> Vec<EligibleCast> {
    module
        .functions
        .iter()
        .filter(|func| func.name != hook_name)
        .flat_map(|func| {
            func.basic_blocks
                .iter()
                .flat_map(move |block| find_eligible_casts(module, func, block))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentStats {
    pub hook: HookOrigin,
    pub casts_instrumented: usize,
    pub stack_casts_skipped: usize,
    pub recasts_inserted: usize,
    pub type_strings: usize,
}

/// State of one instrumentation run over one module.
///
/// Created by [`InstrumentationContext::begin`] and consumed by
/// [`InstrumentationContext::run`], so a type-string table can never be
/// carried over into another module.
#[derive(Debug)]
pub struct InstrumentationContext {
    module_name: Name,
    hook: HookHandle,
    strings: TypeStringTable,
    casts_instrumented: usize,
    stack_casts_skipped: usize,
    recasts_inserted: usize,
}

impl InstrumentationContext {
    /// Ensures the hook exists in `module` and starts with an empty table.
    pub fn begin(module: &mut LirModule, hook_name: &str) -> Result<Self, InstrumentError> {
        let hook = ensure_hook(module, hook_name)?;
        Ok(Self {
            module_name: module.name.clone(),
            hook,
            strings: TypeStringTable::new(),
            casts_instrumented: 0,
            stack_casts_skipped: 0,
            recasts_inserted: 0,
        })
    }

    pub fn hook(&self) -> &HookHandle {
        &self.hook
    }

    pub fn run(mut self, module: &mut LirModule) -> InstrumentStats {
        debug_assert_eq!(self.module_name, module.name);

        for func_idx in 0..module.functions.len() {
            if module.functions[func_idx].name == self.hook.name {
                trace!("not instrumenting the body of @{}", self.hook.name);
                continue;
            }
            for block_idx in 0..module.functions[func_idx].basic_blocks.len() {
                self.instrument_block(module, func_idx, block_idx);
            }
        }

        InstrumentStats {
            hook: self.hook.origin,
            casts_instrumented: self.casts_instrumented,
            stack_casts_skipped: self.stack_casts_skipped,
            recasts_inserted: self.recasts_inserted,
            type_strings: self.strings.len(),
        }
    }

    fn instrument_block(&mut self, module: &mut LirModule, func_idx: usize, block_idx: usize) {
        // Snapshot first; the block is rewritten only once every call is built.
        let casts = {
            let func = &module.functions[func_idx];
            let block = &func.basic_blocks[block_idx];
            let mut casts = Vec::new();
            for inst in &block.instructions {
                match classify(module, func, block.id, inst) {
                    Verdict::Eligible(cast) => casts.push(cast),
                    Verdict::StackSourced => self.stack_casts_skipped += 1,
                    Verdict::Ignored => {}
                }
            }
            casts
        };
        if casts.is_empty() {
            return;
        }

        let mut next_id = module.functions[func_idx].next_instruction_id();
        let mut preludes: HashMap<LirId, Vec<LirInstruction>> = HashMap::new();

        for cast in &casts {
            let type_string = self.strings.get_or_create(&cast.pointee, module);
            let debug_info = module.functions[func_idx].basic_blocks[block_idx]
                .instructions
                .iter()
                .find(|inst| inst.id == cast.instruction)
                .and_then(|inst| inst.debug_info.clone());

            let mut prelude = Vec::with_capacity(2);
            let generic = if cast.source_ty == Ty::i8_ptr() {
                cast.source.clone()
            } else {
                let recast = LirInstruction {
                    id: next_id,
                    kind: LirInstructionKind::Bitcast(cast.source.clone(), Ty::i8_ptr()),
                    type_hint: None,
                    debug_info: debug_info.clone(),
                };
                next_id += 1;
                self.recasts_inserted += 1;
                prelude.push(recast);
                LirValue::Register(next_id - 1)
            };

            prelude.push(LirInstruction {
                id: next_id,
                kind: LirInstructionKind::Call {
                    function: self.hook.callee(),
                    args: vec![generic, type_string.first_byte()],
                    calling_convention: CallingConvention::C,
                    tail_call: false,
                },
                type_hint: Some(Ty::Void),
                debug_info,
            });
            next_id += 1;

            trace!(
                "@{} bb{}: hook before %r{} ({} -> {}*)",
                cast.function,
                cast.block,
                cast.instruction,
                cast.source_ty,
                cast.pointee
            );
            preludes.insert(cast.instruction, prelude);
        }

        let block = &mut module.functions[func_idx].basic_blocks[block_idx];
        let original = std::mem::take(&mut block.instructions);
        let mut rewritten = Vec::with_capacity(original.len() + preludes.len() * 2);
        for inst in original {
            if let Some(prelude) = preludes.remove(&inst.id) {
                rewritten.extend(prelude);
            }
            rewritten.push(inst);
        }
        block.instructions = rewritten;
        self.casts_instrumented += casts.len();
    }
}

/// The instrumentation pass. Holds configuration only; every module visit
/// starts from a fresh [`InstrumentationContext`].
#[derive(Debug, Clone, Default)]
pub struct CastInstrumenter {
    config: InstrumentConfig,
}

impl CastInstrumenter {
    pub fn new(config: InstrumentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    pub fn instrument(&self, module: &mut LirModule) -> Result<InstrumentStats, InstrumentError> {
        let _span = info_span!("instrument", module = %module.name).entered();
        let context = InstrumentationContext::begin(module, &self.config.hook_name)?;
        let stats = context.run(module);
        info!(
            "instrumented {} casts in '{}' ({} type strings, {} stack casts skipped, hook {:?})",
            stats.casts_instrumented,
            module.name,
            stats.type_strings,
            stats.stack_casts_skipped,
            stats.hook
        );
        Ok(stats)
    }
}

impl ModulePass for CastInstrumenter {
    fn name(&self) -> &'static str {
        PASS_NAME
    }

    /// Always reports a change: even without eligible casts the hook is
    /// guaranteed to be present afterwards.
    fn run_on_module(&self, module: &mut LirModule) -> Result<bool, PipelineError> {
        let stats = self.instrument(module)?;
        debug!("{:?}", stats);
        Ok(true)
    }
}

//! Structural well-formedness checks run by the pipeline around every pass.
//!
//! Codes: V001 duplicate symbol, V002 duplicate block, V003 duplicate
//! register, V004 unknown phi predecessor, V005 call arity, V006 pointer and
//! non-pointer bitcast, V007 unknown branch target, V008 undefined operand,
//! V009 address of unknown global, V010 bitcast operand of unknown type.

use std::collections::HashSet;

use crate::diagnostics::{Diagnostic, IrLocation};
use crate::error::{Error, Result};

use super::{LirConstant, LirFunction, LirInstructionKind, LirModule, LirValue};

impl LirModule {
    pub fn verify(&self) -> Result<()> {
        let diagnostics = verify_module(self);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Err(Error::Verification(diagnostics));
        }
        Ok(())
    }
}

pub fn verify_module(module: &LirModule) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let mut symbols = HashSet::new();
    for name in module
        .functions
        .iter()
        .map(|func| &func.name)
        .chain(module.globals.iter().map(|global| &global.name))
    {
        if !symbols.insert(name.as_str()) {
            diagnostics.push(
                Diagnostic::error(format!("symbol @{} is defined more than once", name))
                    .with_code("V001"),
            );
        }
    }

    for global in &module.globals {
        if let Some(initializer) = &global.initializer {
            check_constant(module, initializer, None, &mut diagnostics);
        }
    }

    for func in &module.functions {
        verify_function(module, func, &mut diagnostics);
    }

    diagnostics
}

fn verify_function(module: &LirModule, func: &LirFunction, diagnostics: &mut Vec<Diagnostic>) {
    let mut block_ids = HashSet::new();
    for block in &func.basic_blocks {
        if !block_ids.insert(block.id) {
            diagnostics.push(
                Diagnostic::error(format!("block bb{} is defined more than once", block.id))
                    .with_location(IrLocation::function(&func.name).in_block(block.id))
                    .with_code("V002"),
            );
        }
    }

    let mut registers = HashSet::new();
    for inst in func.instructions() {
        if !registers.insert(inst.id) {
            diagnostics.push(
                Diagnostic::error(format!("register %r{} is defined more than once", inst.id))
                    .with_location(IrLocation::function(&func.name).at_instruction(inst.id))
                    .with_code("V003"),
            );
        }
    }

    for block in &func.basic_blocks {
        let block_location = IrLocation::function(&func.name).in_block(block.id);

        for inst in &block.instructions {
            let location = block_location.clone().at_instruction(inst.id);
            for operand in inst.kind.operands() {
                check_operand(module, func, &registers, operand, &location, diagnostics);
            }

            match &inst.kind {
                LirInstructionKind::Phi { incoming } => {
                    for (_, pred) in incoming {
                        if !block_ids.contains(pred) {
                            diagnostics.push(
                                Diagnostic::error(format!(
                                    "phi names unknown predecessor bb{}",
                                    pred
                                ))
                                .with_location(location.clone())
                                .with_code("V004"),
                            );
                        }
                    }
                }
                LirInstructionKind::Call {
                    function: LirValue::Function(name),
                    args,
                    ..
                } => {
                    if let Some(callee) = module.get_function(name) {
                        let expected = callee.signature.params.len();
                        let arity_ok = if callee.signature.is_variadic {
                            args.len() >= expected
                        } else {
                            args.len() == expected
                        };
                        if !arity_ok {
                            diagnostics.push(
                                Diagnostic::error(format!(
                                    "call to @{} passes {} arguments, expected {}",
                                    name,
                                    args.len(),
                                    expected
                                ))
                                .with_location(location.clone())
                                .with_code("V005"),
                            );
                        }
                    }
                }
                LirInstructionKind::Bitcast(value, target) => {
                    match func.value_type(module, value) {
                        Some(source) if source.is_pointer() != target.is_pointer() => {
                            diagnostics.push(
                                Diagnostic::error(format!(
                                    "bitcast from {} to {} mixes pointer and non-pointer types",
                                    source, target
                                ))
                                .with_location(location.clone())
                                .with_suggestion("use ptrtoint/inttoptr instead")
                                .with_code("V006"),
                            );
                        }
                        Some(_) => {}
                        None => diagnostics.push(
                            Diagnostic::error(format!(
                                "type of bitcast operand {} cannot be resolved",
                                super::pretty::format_value(value)
                            ))
                            .with_location(location.clone())
                            .with_suggestion("give the defining instruction a result type")
                            .with_code("V010"),
                        ),
                    }
                }
                _ => {}
            }
        }

        for operand in block.terminator.operands() {
            check_operand(module, func, &registers, operand, &block_location, diagnostics);
        }
        for target in block.terminator.successors() {
            if !block_ids.contains(&target) {
                diagnostics.push(
                    Diagnostic::error(format!("branch to unknown block bb{}", target))
                        .with_location(block_location.clone())
                        .with_code("V007"),
                );
            }
        }
    }
}

fn check_operand(
    module: &LirModule,
    func: &LirFunction,
    registers: &HashSet<u32>,
    operand: &LirValue,
    location: &IrLocation,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let problem = match operand {
        LirValue::Register(id) if !registers.contains(id) => {
            Some(format!("use of undefined register %r{}", id))
        }
        LirValue::Local(id) if !func.locals.iter().any(|local| local.id == *id) => {
            Some(format!("use of undefined local %local{}", id))
        }
        LirValue::StackSlot(id) if !func.stack_slots.iter().any(|slot| slot.id == *id) => {
            Some(format!("use of undefined stack slot %stack{}", id))
        }
        LirValue::Global(name, _) if module.get_global(name).is_none() => {
            Some(format!("reference to unknown global @{}", name))
        }
        LirValue::Function(name) if module.get_function(name).is_none() => {
            Some(format!("reference to unknown function @{}", name))
        }
        LirValue::Constant(constant) => {
            check_constant(module, constant, Some(location), diagnostics);
            None
        }
        _ => None,
    };

    if let Some(message) = problem {
        diagnostics.push(
            Diagnostic::error(message)
                .with_location(location.clone())
                .with_code("V008"),
        );
    }
}

fn check_constant(
    module: &LirModule,
    constant: &LirConstant,
    location: Option<&IrLocation>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constant {
        LirConstant::GlobalRef(name, _, _) if module.get_global(name).is_none() => {
            let mut diagnostic = Diagnostic::error(format!(
                "constant address of unknown global @{}",
                name
            ))
            .with_code("V009");
            if let Some(location) = location {
                diagnostic = diagnostic.with_location(location.clone());
            }
            diagnostics.push(diagnostic);
        }
        LirConstant::Array(elements, _) | LirConstant::Struct(elements, _) => {
            for element in elements {
                check_constant(module, element, location, diagnostics);
            }
        }
        _ => {}
    }
}

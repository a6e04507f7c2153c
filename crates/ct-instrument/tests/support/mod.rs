//! Shared fixtures for the instrumentation tests.
#![allow(dead_code)]

use ct_core::lir::{
    CallingConvention, DebugInfo, LirBasicBlock, LirConstant, LirFunction, LirFunctionSignature,
    LirId, LirInstruction, LirInstructionKind, LirLocal, LirModule, LirTerminator, LirValue,
    Linkage, StackSlot, Ty,
};
use ct_instrument::PASS_NAME;

pub fn signature(params: Vec<Ty>, return_type: Ty) -> LirFunctionSignature {
    LirFunctionSignature {
        params,
        return_type,
        is_variadic: false,
    }
}

/// A module declaring `i8* @malloc(i64)`.
pub fn module_with_malloc(name: &str) -> LirModule {
    let mut module = LirModule::new(name);
    module.add_function(LirFunction::new(
        "malloc",
        signature(vec![Ty::I64], Ty::i8_ptr()),
        CallingConvention::C,
        Linkage::External,
    ));
    module
}

pub fn struct_a() -> Ty {
    Ty::named_struct("struct.A", vec![Ty::I32, Ty::i8_ptr()])
}

pub fn struct_b() -> Ty {
    Ty::named_struct("struct.B", vec![Ty::F64, Ty::F64])
}

/// Builds a single-block function, handing out instruction ids in order.
pub struct FunctionBuilder {
    func: LirFunction,
    block: LirBasicBlock,
    next_id: LirId,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            func: LirFunction::new(
                name,
                signature(Vec::new(), Ty::Void),
                CallingConvention::C,
                Linkage::External,
            ),
            block: LirBasicBlock::new(0, Some("entry".into())),
            next_id: 0,
        }
    }

    fn push(&mut self, kind: LirInstructionKind, type_hint: Option<Ty>) -> LirId {
        let id = self.next_id;
        self.next_id += 1;
        self.block.add_instruction(LirInstruction {
            id,
            kind,
            type_hint,
            debug_info: None,
        });
        id
    }

    pub fn param(&mut self, ty: Ty) -> LirValue {
        let id = self.func.locals.len() as u32;
        self.func.signature.params.push(ty.clone());
        self.func.locals.push(LirLocal {
            id,
            ty,
            name: Some(format!("p{}", id)),
            is_argument: true,
        });
        LirValue::Local(id)
    }

    pub fn stack_slot(&mut self, size: u32) -> LirValue {
        let id = self.func.stack_slots.len() as u32;
        self.func.stack_slots.push(StackSlot {
            id,
            size,
            alignment: 8,
            name: None,
        });
        LirValue::StackSlot(id)
    }

    pub fn malloc(&mut self, size: i64) -> LirValue {
        self.call_malloc(size, Some(Ty::i8_ptr()))
    }

    /// `malloc` call whose result type comes from the callee declaration.
    pub fn malloc_untyped(&mut self, size: i64) -> LirValue {
        self.call_malloc(size, None)
    }

    fn call_malloc(&mut self, size: i64, type_hint: Option<Ty>) -> LirValue {
        let id = self.push(
            LirInstructionKind::Call {
                function: LirValue::Function("malloc".into()),
                args: vec![LirValue::Constant(LirConstant::Int(size, Ty::I64))],
                calling_convention: CallingConvention::C,
                tail_call: false,
            },
            type_hint,
        );
        LirValue::Register(id)
    }

    pub fn alloca(&mut self, ty: Ty) -> LirValue {
        let id = self.push(
            LirInstructionKind::Alloca {
                ty,
                count: None,
                alignment: 8,
            },
            None,
        );
        LirValue::Register(id)
    }

    pub fn load(&mut self, address: LirValue, ty: Ty) -> LirValue {
        let id = self.push(
            LirInstructionKind::Load {
                address,
                alignment: Some(8),
                volatile: false,
            },
            Some(ty),
        );
        LirValue::Register(id)
    }

    pub fn bitcast(&mut self, value: LirValue, ty: Ty) -> LirId {
        self.push(LirInstructionKind::Bitcast(value, ty), None)
    }

    pub fn bitcast_at(&mut self, value: LirValue, ty: Ty, line: u32) -> LirId {
        let id = self.bitcast(value, ty);
        if let Some(inst) = self.block.instructions.last_mut() {
            inst.debug_info = Some(DebugInfo {
                file: "alloc.c".into(),
                line,
                column: 5,
                scope: None,
            });
        }
        id
    }

    pub fn trunc(&mut self, value: LirValue, ty: Ty) -> LirId {
        self.push(LirInstructionKind::Trunc(value, ty), None)
    }

    pub fn add(&mut self, lhs: LirValue, rhs: LirValue, ty: Ty) -> LirValue {
        let id = self.push(LirInstructionKind::Add(lhs, rhs), Some(ty));
        LirValue::Register(id)
    }

    pub fn finish(mut self) -> LirFunction {
        self.block.set_terminator(LirTerminator::Return(None));
        self.func.add_basic_block(self.block);
        self.func
    }
}

pub fn block_of<'a>(module: &'a LirModule, function: &str) -> &'a LirBasicBlock {
    &module
        .get_function(function)
        .expect("function exists")
        .basic_blocks[0]
}

/// Hook calls of a block, as (position, args).
pub fn hook_calls(block: &LirBasicBlock) -> Vec<(usize, Vec<LirValue>)> {
    block
        .instructions
        .iter()
        .enumerate()
        .filter_map(|(pos, inst)| match &inst.kind {
            LirInstructionKind::Call {
                function: LirValue::Function(name),
                args,
                ..
            } if name == PASS_NAME => Some((pos, args.clone())),
            _ => None,
        })
        .collect()
}

/// Name of the string global referenced by a hook call's second argument.
pub fn type_string_global(arg: &LirValue) -> &str {
    match arg {
        LirValue::Constant(LirConstant::GlobalRef(name, _, indices)) => {
            assert_eq!(indices, &vec![0, 0], "type string must point at byte 0");
            name
        }
        other => panic!("expected constant address of a type string, got {other:?}"),
    }
}

pub fn string_globals(module: &LirModule) -> Vec<&str> {
    module
        .globals
        .iter()
        .filter(|global| global.name.starts_with(".str"))
        .map(|global| global.name.as_str())
        .collect()
}

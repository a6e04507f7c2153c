mod support;

use ct_core::lir::{LirInstructionKind, LirModule, LirTerminator, LirValue, Ty};
use ct_instrument::{CastInstrumenter, PASS_NAME};
use ct_pipeline::ModulePass;
use pretty_assertions::assert_eq;
use support::{block_of, hook_calls, module_with_malloc, struct_a, struct_b, FunctionBuilder};

#[test]
fn hook_call_sits_right_before_the_cast() {
    let mut module = module_with_malloc("m");
    let mut f = FunctionBuilder::new("f");
    let raw = f.malloc(16);
    let first = f.bitcast(raw.clone(), Ty::ptr(struct_a()));
    f.add(
        LirValue::Constant(ct_core::lir::LirConstant::Int(1, Ty::I64)),
        LirValue::Constant(ct_core::lir::LirConstant::Int(2, Ty::I64)),
        Ty::I64,
    );
    let second = f.bitcast(raw, Ty::ptr(struct_b()));
    module.add_function(f.finish());
    let original = block_of(&module, "f").clone();

    CastInstrumenter::default().instrument(&mut module).unwrap();
    let block = block_of(&module, "f");

    let calls = hook_calls(block);
    assert_eq!(calls.len(), 2);
    for ((call_pos, _), cast_id) in calls.iter().zip([first, second]) {
        assert_eq!(block.instructions[call_pos + 1].id, cast_id);
    }

    // Original instructions keep their ids, operands and relative order.
    let survivors = block
        .instructions
        .iter()
        .filter(|inst| original.position_of(inst.id).is_some())
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(survivors, original.instructions);
    assert_eq!(block.terminator, original.terminator);
}

#[test]
fn byte_pointer_sources_are_passed_through() {
    let mut module = module_with_malloc("m");
    let mut f = FunctionBuilder::new("f");
    let raw = f.malloc(8);
    f.bitcast(raw.clone(), Ty::ptr(Ty::I64));
    module.add_function(f.finish());

    let stats = CastInstrumenter::default().instrument(&mut module).unwrap();
    assert_eq!(stats.recasts_inserted, 0);

    let calls = hook_calls(block_of(&module, "f"));
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1[0], raw);
}

#[test]
fn typed_sources_are_viewed_as_byte_pointers_first() {
    let mut module = module_with_malloc("m");
    let mut f = FunctionBuilder::new("f");
    let typed = f.param(Ty::ptr(struct_a()));
    let cast = f.bitcast(typed.clone(), Ty::ptr(struct_b()));
    module.add_function(f.finish());

    let stats = CastInstrumenter::default().instrument(&mut module).unwrap();
    assert_eq!(stats.recasts_inserted, 1);

    let block = block_of(&module, "f");
    let ids = block.instructions.iter().map(|inst| inst.id).collect::<Vec<_>>();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[2], cast);

    let recast = &block.instructions[0];
    assert_eq!(
        recast.kind,
        LirInstructionKind::Bitcast(typed, Ty::i8_ptr())
    );
    let (call_pos, args) = &hook_calls(block)[0];
    assert_eq!(*call_pos, 1);
    assert_eq!(args[0], LirValue::Register(recast.id));
    assert!(module.verify().is_ok());
}

#[test]
fn inserted_instructions_inherit_the_cast_location() {
    let mut module = module_with_malloc("m");
    let mut f = FunctionBuilder::new("f");
    let typed = f.param(Ty::ptr(Ty::I16));
    let cast = f.bitcast_at(typed, Ty::ptr(Ty::I32), 42);
    module.add_function(f.finish());

    CastInstrumenter::default().instrument(&mut module).unwrap();
    let block = block_of(&module, "f");
    for inst in &block.instructions {
        let debug = inst.debug_info.as_ref().expect("location is carried over");
        assert_eq!(debug.line, 42, "instruction %r{} (cast %r{})", inst.id, cast);
    }
}

#[test]
fn casts_in_every_block_and_function_are_visited() {
    let mut module = module_with_malloc("m");
    for name in ["a", "b"] {
        let mut f = FunctionBuilder::new(name);
        let raw = f.malloc(4);
        f.bitcast(raw, Ty::ptr(Ty::I32));
        let mut func = f.finish();
        let mut second = func.basic_blocks[0].clone();
        second.id = 1;
        for inst in &mut second.instructions {
            inst.id += 10;
        }
        if let LirInstructionKind::Bitcast(LirValue::Register(src), _) =
            &mut second.instructions[1].kind
        {
            *src += 10;
        }
        func.basic_blocks[0].set_terminator(LirTerminator::Br(1));
        func.add_basic_block(second);
        module.add_function(func);
    }
    assert!(module.verify().is_ok());

    let stats = CastInstrumenter::default().instrument(&mut module).unwrap();
    assert_eq!(stats.casts_instrumented, 4);
    assert_eq!(stats.type_strings, 1);
    for name in ["a", "b"] {
        for block in &module.get_function(name).unwrap().basic_blocks {
            assert_eq!(hook_calls(block).len(), 1);
        }
    }
    assert!(module.verify().is_ok());
}

#[test]
fn pass_reports_a_change_even_without_casts() {
    let mut module = LirModule::new("empty");
    let changed = CastInstrumenter::default()
        .run_on_module(&mut module)
        .unwrap();
    assert!(changed);
    assert!(module.get_function(PASS_NAME).is_some());
}

#[test]
fn every_static_cast_gets_its_own_call() {
    let mut module = module_with_malloc("m");
    let mut f = FunctionBuilder::new("f");
    let raw = f.malloc(4);
    f.bitcast(raw.clone(), Ty::ptr(Ty::I32));
    f.bitcast(raw.clone(), Ty::ptr(Ty::I32));
    f.bitcast(raw, Ty::ptr(Ty::I32));
    module.add_function(f.finish());

    let stats = CastInstrumenter::default().instrument(&mut module).unwrap();
    assert_eq!(stats.casts_instrumented, 3);
    assert_eq!(hook_calls(block_of(&module, "f")).len(), 3);
}

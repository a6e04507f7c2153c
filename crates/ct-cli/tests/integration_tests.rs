//! Integration tests for the casttrace CLI

use assert_cmd::Command;
use ct_core::io::{module_from_json, read_module, write_module};
use ct_core::lir::{
    CallingConvention, LirBasicBlock, LirConstant, LirFunction, LirFunctionSignature,
    LirInstruction, LirInstructionKind, LirLocal, LirModule, LirTerminator, LirValue, Linkage, Ty,
};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn signature(params: Vec<Ty>, return_type: Ty) -> LirFunctionSignature {
    LirFunctionSignature {
        params,
        return_type,
        is_variadic: false,
    }
}

/// `make_a` casts a fresh `malloc` result to `%struct.A*`; `local_a` casts
/// an alloca and must be left alone.
fn allocation_module() -> LirModule {
    let struct_a = Ty::named_struct("struct.A", vec![Ty::I32, Ty::i8_ptr()]);
    let mut module = LirModule::new("alloc");
    module.add_function(LirFunction::new(
        "malloc",
        signature(vec![Ty::I64], Ty::i8_ptr()),
        CallingConvention::C,
        Linkage::External,
    ));

    let mut make_a = LirFunction::new(
        "make_a",
        signature(Vec::new(), Ty::Void),
        CallingConvention::C,
        Linkage::External,
    );
    let mut entry = LirBasicBlock::new(0, Some("entry".into()));
    entry.add_instruction(
        LirInstruction::new(
            0,
            LirInstructionKind::Call {
                function: LirValue::Function("malloc".into()),
                args: vec![LirValue::Constant(LirConstant::Int(16, Ty::I64))],
                calling_convention: CallingConvention::C,
                tail_call: false,
            },
        )
        .with_type(Ty::i8_ptr()),
    );
    entry.add_instruction(LirInstruction::new(
        1,
        LirInstructionKind::Bitcast(LirValue::Register(0), Ty::ptr(struct_a.clone())),
    ));
    entry.set_terminator(LirTerminator::Return(None));
    make_a.add_basic_block(entry);
    module.add_function(make_a);

    let mut local_a = LirFunction::new(
        "local_a",
        signature(Vec::new(), Ty::Void),
        CallingConvention::C,
        Linkage::External,
    );
    let mut entry = LirBasicBlock::new(0, Some("entry".into()));
    entry.add_instruction(LirInstruction::new(
        0,
        LirInstructionKind::Alloca {
            ty: struct_a,
            count: None,
            alignment: 8,
        },
    ));
    entry.add_instruction(LirInstruction::new(
        1,
        LirInstructionKind::Bitcast(LirValue::Register(0), Ty::i8_ptr()),
    ));
    entry.set_terminator(LirTerminator::Return(None));
    local_a.add_basic_block(entry);
    module.add_function(local_a);

    module
}

fn write_fixture(dir: &Path, module: &LirModule) -> PathBuf {
    let path = dir.join(format!("{}.json", module.name));
    write_module(module, &path).unwrap();
    path
}

fn casttrace() -> Command {
    Command::cargo_bin("casttrace").unwrap()
}

fn hook_calls(module: &LirModule, function: &str, hook: &str) -> usize {
    module
        .get_function(function)
        .unwrap()
        .instructions()
        .filter(|inst| {
            matches!(
                &inst.kind,
                LirInstructionKind::Call { function: LirValue::Function(name), .. } if name == hook
            )
        })
        .count()
}

#[test]
fn test_cli_help() {
    casttrace()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("casttrace"));
}

#[test]
fn test_cli_version() {
    casttrace()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_instrument_to_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(temp_dir.path(), &allocation_module());

    let output = casttrace().arg("instrument").arg(&input).output().unwrap();
    assert!(output.status.success());

    let module = module_from_json(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert_eq!(hook_calls(&module, "make_a", "casttrace"), 1);
    assert_eq!(hook_calls(&module, "local_a", "casttrace"), 0);
    assert!(module.get_global(".str").is_some());
    assert!(module.verify().is_ok());
}

#[test]
fn test_instrument_as_text() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(temp_dir.path(), &allocation_module());

    casttrace()
        .args(["instrument", "--emit", "text", "-O", "2"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("call void @casttrace("))
        .stdout(predicate::str::contains("private unnamed_addr constant"))
        .stdout(predicate::str::contains(r#"c"%struct.A = type { i32, i8* }\00""#));
}

#[test]
fn test_instrument_to_file_with_custom_hook() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(temp_dir.path(), &allocation_module());
    let output = temp_dir.path().join("out.json");

    casttrace()
        .arg("instrument")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--hook-name", "__cast_trace"])
        .assert()
        .success();

    let module = read_module(&output).unwrap();
    assert!(module.get_function("__cast_trace").is_some());
    assert!(module.get_function("casttrace").is_none());
    assert_eq!(hook_calls(&module, "make_a", "__cast_trace"), 1);
}

#[test]
fn test_hook_name_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(temp_dir.path(), &allocation_module());
    let config = temp_dir.path().join("casttrace.toml");
    std::fs::write(&config, "[instrument]\nhook_name = \"__from_config\"\n").unwrap();

    let output = casttrace()
        .arg("-c")
        .arg(&config)
        .arg("instrument")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let module = module_from_json(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert_eq!(hook_calls(&module, "make_a", "__from_config"), 1);
}

#[test]
fn test_conflicting_hook_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(temp_dir.path(), &allocation_module());

    casttrace()
        .arg("instrument")
        .arg(&input)
        .args(["--hook-name", "malloc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("@malloc"));
}

#[test]
fn test_inspect_lists_heap_casts_only() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(temp_dir.path(), &allocation_module());

    casttrace()
        .arg("inspect")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("@make_a bb0 %r1"))
        .stdout(predicate::str::contains("@local_a").not());
}

#[test]
fn test_inspect_leaves_out_the_hook_body() {
    let temp_dir = TempDir::new().unwrap();
    let mut module = allocation_module();
    let mut hook = LirFunction::new(
        "__cast_trace",
        signature(vec![Ty::i8_ptr(), Ty::i8_ptr()], Ty::Void),
        CallingConvention::C,
        Linkage::External,
    );
    hook.locals.push(LirLocal {
        id: 0,
        ty: Ty::i8_ptr(),
        name: Some("ptr".into()),
        is_argument: true,
    });
    let mut entry = LirBasicBlock::new(0, Some("entry".into()));
    entry.add_instruction(LirInstruction::new(
        0,
        LirInstructionKind::Bitcast(LirValue::Local(0), Ty::ptr(Ty::I64)),
    ));
    entry.set_terminator(LirTerminator::Return(None));
    hook.add_basic_block(entry);
    module.add_function(hook);
    let input = write_fixture(temp_dir.path(), &module);

    casttrace()
        .arg("inspect")
        .arg(&input)
        .args(["--hook-name", "__cast_trace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("@make_a bb0 %r1"))
        .stdout(predicate::str::contains("@__cast_trace").not())
        .stdout(predicate::str::contains("1 eligible cast(s)"));
}

#[test]
fn test_verify_accepts_well_formed_module() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(temp_dir.path(), &allocation_module());

    casttrace()
        .arg("verify")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("well-formed"));
}

#[test]
fn test_verify_rejects_dangling_branch() {
    let temp_dir = TempDir::new().unwrap();
    let mut module = allocation_module();
    module.get_function_mut("make_a").unwrap().basic_blocks[0]
        .set_terminator(LirTerminator::Br(9));
    let input = write_fixture(temp_dir.path(), &module);

    casttrace()
        .args(["verify", "--plain"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("V007"));
}

#[test]
fn test_missing_input_fails() {
    casttrace()
        .arg("instrument")
        .arg("does-not-exist.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.json"));
}

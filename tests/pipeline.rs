//! End-to-end tests: source text through code generation, the JIT, and the
//! native build.

use blitzc::codegen::{CodegenError, ResolutionError};
use blitzc::{compile_source, emit_ir, Error, OptLevel, RuntimeBindings};
use inkwell::context::Context;

const FIB: &str = "\
Function Fib(n)
  If n < 2 Then Return n
  Return Fib(n - 1) + Fib(n - 2)
End Function
";

#[test]
fn jit_fibonacci() {
    let llvm = Context::create();
    let module = compile_source(&llvm, FIB, "fib").expect("compiles");
    assert_eq!(module.function_symbol("fib").as_deref(), Some("_ffib"));

    let session = module.jit(&RuntimeBindings::default()).expect("jit");
    assert_eq!(session.call_i32("Fib", &[5]).expect("call"), 5);
    assert_eq!(session.call_i32("FIB", &[10]).expect("call"), 55);
}

#[test]
fn jit_after_optimization() {
    let llvm = Context::create();
    let module = compile_source(&llvm, FIB, "fib").expect("compiles");
    module.optimize(OptLevel::Aggressive).expect("optimizes");
    module.verify().expect("still valid");

    let session = module.jit(&RuntimeBindings::default()).expect("jit");
    assert_eq!(session.call_i32("Fib", &[12]).expect("call"), 144);
}

#[test]
fn jit_mutual_recursion() {
    let source = "\
Function IsEven(n)
  If n = 0 Then Return 1
  Return IsOdd(n - 1)
End Function

Function IsOdd(n)
  If n = 0 Then Return 0
  Return IsEven(n - 1)
End Function
";
    let llvm = Context::create();
    let session = compile_source(&llvm, source, "parity")
        .expect("compiles")
        .jit(&RuntimeBindings::default())
        .expect("jit");
    assert_eq!(session.call_i32("IsEven", &[10]).expect("call"), 1);
    assert_eq!(session.call_i32("IsOdd", &[7]).expect("call"), 1);
    assert_eq!(session.call_i32("IsEven", &[7]).expect("call"), 0);
}

#[test]
fn jit_arity_is_checked() {
    let llvm = Context::create();
    let session = compile_source(&llvm, FIB, "fib")
        .expect("compiles")
        .jit(&RuntimeBindings::default())
        .expect("jit");
    assert!(matches!(
        session.call_i32("Fib", &[1, 2]),
        Err(CodegenError::Arity { expected: 1, found: 2, .. })
    ));
    assert!(matches!(
        session.call_i32("Missing", &[]),
        Err(CodegenError::Resolution(ResolutionError::UnknownFunction(_)))
    ));
}

#[test]
fn jit_captures_print_output() {
    let source = "\
Print \"Hello\"
x = 6 * 7
Print \"x = \" + x
Write \"a\"
Write 1.5
Print \"\"
If x > 40 Then Print \"big\" Else Print \"small\"
Print 10 / 4
Print 10.0 / 4
Print 7 MOD 3
";
    let output = blitzc::run_jit_captured(source, OptLevel::None).expect("runs");
    assert_eq!(output, "Hello\nx = 42\na1.5\nbig\n2\n2.5\n1\n");
}

#[test]
fn jit_sessions_keep_their_own_strings() {
    let source = "s = \"n\" + 1\nPrint s";
    let llvm = Context::create();
    let first = compile_source(&llvm, source, "first")
        .expect("compiles")
        .jit(&RuntimeBindings::default())
        .expect("jit");
    let second = compile_source(&llvm, source, "second")
        .expect("compiles")
        .jit(&RuntimeBindings::default())
        .expect("jit");

    assert_eq!(first.run_main_captured().expect("runs"), "n1\n");
    drop(first);
    assert_eq!(second.run_main_captured().expect("runs"), "n1\n");
}

#[test]
fn jit_float_not_equal_negates_equal() {
    let source = "\
nan = 0.0 / 0.0
Print nan <> nan
Print nan = nan
Print 1.5 <> 2.5
Print 1.5 <> 1.5
";
    let output = blitzc::run_jit_captured(source, OptLevel::None).expect("runs");
    assert_eq!(output, "1\n0\n1\n0\n");
}

#[test]
fn jit_block_if_and_functions() {
    let source = "\
Function Sign(n)
  If n < 0
    Return -1
  ElseIf n = 0
    Return 0
  EndIf
  Return 1
End Function

Print Sign(-5)
Print Sign(0)
Print Sign(9)
";
    let output = blitzc::run_jit_captured(source, OptLevel::Default).expect("runs");
    assert_eq!(output, "-1\n0\n1\n");
}

#[test]
fn ir_has_entry_runtime_and_one_global_per_literal() {
    let ir = emit_ir("Print \"a\"\nPrint \"a\"", None).expect("compiles");
    assert!(ir.contains("define void @bbmain()"));
    assert!(ir.contains("declare void @Print(ptr)"));
    let string_globals = ir
        .lines()
        .filter(|line| line.starts_with("@str") && line.contains("c\"a\\00\""))
        .count();
    assert_eq!(string_globals, 2);
}

#[test]
fn undeclared_identifier_produces_no_module() {
    let llvm = Context::create();
    match compile_source(&llvm, "Print y", "bad") {
        Err(Error::Codegen(CodegenError::Resolution(ResolutionError::UnknownIdentifier(name)))) => {
            assert_eq!(name, "y")
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a resolution error"),
    }
}

#[test]
fn syntax_errors_surface_from_the_pipeline() {
    let err = emit_ir("10 20", None).unwrap_err();
    assert_eq!(err.to_string(), "Unexpected INTLIT '20' at 1:4");
    let err = emit_ir("x = 1 ?", None).unwrap_err();
    assert_eq!(err.to_string(), "Illegal character '?' at 1:7");
}

#[test]
fn assembly_mentions_entry() {
    let asm = blitzc::emit_assembly("Print \"hi\"", OptLevel::Default).expect("emits");
    assert!(asm.contains("bbmain"));
}

#[test]
fn native_build_runs() {
    if ["cc", "gcc", "clang"]
        .iter()
        .all(|cc| which::which(cc).is_err())
    {
        eprintln!("no C compiler available, skipping");
        return;
    }

    let dir = blitzc::link::TempBuildDir::new().expect("temp dir");
    let exe = dir.path().join("hello");
    let source = format!("{FIB}Print \"fib \" + Fib(10)\n");
    blitzc::build_native(&source, &exe, &blitzc::BuildConfig::default()).expect("builds");

    let output = blitzc::link::run_executable(&exe).expect("runs");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "fib 55\n");
}

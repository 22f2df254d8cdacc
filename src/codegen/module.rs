//! A generated, verified LLVM module and what can be done with it

use inkwell::module::Module;
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::OptimizationLevel;
use tracing::{debug, info};

use super::error::{CodegenError, CodegenResult};
use super::jit::{JitSession, RuntimeBindings};

/// Symbol of the program's entry procedure
pub const ENTRY_SYMBOL: &str = "bbmain";

/// The LLVM symbol of a user function, from its (case-insensitive) name
pub fn function_symbol(name: &str) -> String {
    format!("_f{}", name.to_lowercase())
}

/// Optimization level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    None,
    Less,
    #[default]
    Default,
    Aggressive,
}

impl OptLevel {
    /// From a numeric `-O` level; anything above 3 is aggressive.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => OptLevel::None,
            1 => OptLevel::Less,
            2 => OptLevel::Default,
            _ => OptLevel::Aggressive,
        }
    }

    /// The new pass manager pipeline for this level
    pub fn pipeline(self) -> &'static str {
        match self {
            OptLevel::None => "default<O0>",
            OptLevel::Less => "default<O1>",
            OptLevel::Default => "default<O2>",
            OptLevel::Aggressive => "default<O3>",
        }
    }

    pub fn llvm(self) -> OptimizationLevel {
        match self {
            OptLevel::None => OptimizationLevel::None,
            OptLevel::Less => OptimizationLevel::Less,
            OptLevel::Default => OptimizationLevel::Default,
            OptLevel::Aggressive => OptimizationLevel::Aggressive,
        }
    }
}

/// A target machine for the host
pub fn host_target_machine(level: OptLevel) -> CodegenResult<TargetMachine> {
    Target::initialize_native(&InitializationConfig::default()).map_err(CodegenError::Target)?;

    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple).map_err(|e| CodegenError::Target(e.to_string()))?;
    let cpu = TargetMachine::get_host_cpu_name().to_string();
    let features = TargetMachine::get_host_cpu_features().to_string();

    target
        .create_target_machine(
            &triple,
            &cpu,
            &features,
            level.llvm(),
            RelocMode::PIC,
            CodeModel::Default,
        )
        .ok_or_else(|| {
            CodegenError::Target(format!(
                "could not create a target machine for {}",
                triple.as_str().to_string_lossy()
            ))
        })
}

/// A verified module containing `bbmain` and the user functions
pub struct CompiledModule<'ctx> {
    module: Module<'ctx>,
}

impl<'ctx> CompiledModule<'ctx> {
    pub(crate) fn new(module: Module<'ctx>) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    /// LLVM IR text
    pub fn ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn verify(&self) -> CodegenResult<()> {
        self.module
            .verify()
            .map_err(|e| CodegenError::Verification(e.to_string()))
    }

    /// Run one optimization pipeline over the module
    pub fn optimize(&self, level: OptLevel) -> CodegenResult<()> {
        let machine = host_target_machine(level)?;
        self.prepare_for(&machine);
        self.module
            .run_passes(level.pipeline(), &machine, PassBuilderOptions::create())
            .map_err(|e| CodegenError::Target(e.to_string()))?;
        info!(pipeline = level.pipeline(), "optimized module");
        Ok(())
    }

    /// Host assembly for the module
    pub fn emit_assembly(&self) -> CodegenResult<String> {
        let machine = host_target_machine(OptLevel::Default)?;
        self.prepare_for(&machine);
        let buffer = machine
            .write_to_memory_buffer(&self.module, FileType::Assembly)
            .map_err(|e| CodegenError::Target(e.to_string()))?;
        let asm = String::from_utf8_lossy(buffer.as_slice()).into_owned();
        debug!(bytes = asm.len(), "emitted assembly");
        Ok(asm)
    }

    fn prepare_for(&self, machine: &TargetMachine) {
        self.module.set_triple(&machine.get_triple());
        self.module
            .set_data_layout(&machine.get_target_data().get_data_layout());
    }

    pub fn entry_symbol(&self) -> &'static str {
        ENTRY_SYMBOL
    }

    /// The LLVM symbol of user function `name`, if the program defines it
    pub fn function_symbol(&self, name: &str) -> Option<String> {
        let symbol = function_symbol(name);
        self.module.get_function(&symbol).map(|_| symbol)
    }

    /// Finalize the module in a JIT execution engine
    pub fn jit(self, bindings: &RuntimeBindings) -> CodegenResult<JitSession<'ctx>> {
        JitSession::new(self.module, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_levels() {
        assert_eq!(OptLevel::from_level(0), OptLevel::None);
        assert_eq!(OptLevel::from_level(2), OptLevel::Default);
        assert_eq!(OptLevel::from_level(9), OptLevel::Aggressive);
        assert_eq!(OptLevel::default().pipeline(), "default<O2>");
    }

    #[test]
    fn test_function_symbols_fold_case() {
        assert_eq!(function_symbol("Fib"), "_ffib");
        assert_eq!(function_symbol("FIB"), function_symbol("fib"));
        assert_eq!(function_symbol("Привет"), "_fпривет");
    }

    #[test]
    fn test_verifier_output_is_passed_through() {
        let llvm = inkwell::context::Context::create();
        let module = llvm.create_module("broken");
        let function = module.add_function("broken", llvm.void_type().fn_type(&[], false), None);
        // a block without a terminator
        llvm.append_basic_block(function, "entry");

        let llvm_message = module.verify().expect_err("module is malformed").to_string();
        let compiled = CompiledModule::new(module);
        match compiled.verify() {
            Err(CodegenError::Verification(message)) => {
                assert_eq!(message, llvm_message);
                assert!(message.contains("does not have terminator"), "{message}");
            }
            other => panic!("expected a verification error, got {other:?}"),
        }
    }
}

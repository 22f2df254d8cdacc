//! In-process execution of a compiled module

use std::path::PathBuf;

use inkwell::execution_engine::{ExecutionEngine, FunctionLookupError};
use inkwell::module::Module;
use inkwell::support::load_library_permanently;
use inkwell::targets::{InitializationConfig, Target};
use inkwell::OptimizationLevel;
use tracing::{debug, info};

use super::error::{CodegenError, CodegenResult, ResolutionError};
use super::module::{function_symbol, ENTRY_SYMBOL};
use super::runtime::RUNTIME_FUNCTIONS;
use crate::runtime::{self, Arena};

/// Where the JIT finds the runtime library
#[derive(Debug, Clone)]
pub struct RuntimeBindings {
    /// Shared libraries loaded into the process before finalization
    pub libraries: Vec<PathBuf>,
    /// Map runtime declarations onto the host implementations
    pub host: bool,
}

impl Default for RuntimeBindings {
    fn default() -> Self {
        Self {
            libraries: Vec::new(),
            host: true,
        }
    }
}

impl RuntimeBindings {
    /// Resolve the runtime only from `libraries`
    pub fn libraries(libraries: Vec<PathBuf>) -> Self {
        Self {
            libraries,
            host: false,
        }
    }
}

/// A module finalized for execution.
///
/// Strings the host runtime returns during a call belong to the session and
/// are freed when it is dropped.
pub struct JitSession<'ctx> {
    engine: ExecutionEngine<'ctx>,
    module: Module<'ctx>,
    arena: Arena,
}

impl<'ctx> JitSession<'ctx> {
    pub(crate) fn new(module: Module<'ctx>, bindings: &RuntimeBindings) -> CodegenResult<Self> {
        Target::initialize_native(&InitializationConfig::default()).map_err(CodegenError::Jit)?;

        for library in &bindings.libraries {
            // `true` means the library could not be loaded
            if load_library_permanently(library) {
                return Err(CodegenError::Jit(format!(
                    "could not load library {}",
                    library.display()
                )));
            }
            debug!(library = %library.display(), "loaded runtime library");
        }

        let engine = module
            .create_jit_execution_engine(OptimizationLevel::None)
            .map_err(|e| CodegenError::Jit(e.to_string()))?;

        if bindings.host {
            for func in RUNTIME_FUNCTIONS {
                let (Some(declaration), Some(address)) = (
                    module.get_function(func.symbol),
                    runtime::host_address(func.symbol),
                ) else {
                    continue;
                };
                engine.add_global_mapping(&declaration, address);
            }
        }
        info!(host = bindings.host, libraries = bindings.libraries.len(), "JIT session ready");

        Ok(Self {
            engine,
            module,
            arena: Arena::allocate(),
        })
    }

    /// Run `bbmain`
    pub fn run_main(&self) -> CodegenResult<()> {
        // SAFETY: bbmain is generated as `void ()`
        unsafe {
            let main = self
                .engine
                .get_function::<unsafe extern "C" fn()>(ENTRY_SYMBOL)
                .map_err(|e| CodegenError::Jit(e.to_string()))?;
            self.arena.enter(|| main.call());
        }
        Ok(())
    }

    /// Run `bbmain` and return what it printed
    pub fn run_main_captured(&self) -> CodegenResult<String> {
        let (result, output) = runtime::capture_output(|| self.run_main());
        result.map(|()| output)
    }

    /// Call a user function by its Blitz name with integer arguments
    pub fn call_i32(&self, name: &str, args: &[i32]) -> CodegenResult<i32> {
        let symbol = function_symbol(name);
        let function = self
            .module
            .get_function(&symbol)
            .ok_or_else(|| ResolutionError::UnknownFunction(name.to_string()))?;
        let arity = function.count_params() as usize;
        if arity != args.len() {
            return Err(CodegenError::Arity {
                name: name.to_string(),
                expected: arity,
                found: args.len(),
            });
        }

        let jit_err = |e: FunctionLookupError| CodegenError::Jit(e.to_string());
        // SAFETY: user functions are generated as `i32 (i32, ...)` and the
        // arity was checked above
        self.arena.enter(|| -> CodegenResult<i32> {
            unsafe {
                match *args {
                    [] => Ok(self
                        .engine
                        .get_function::<unsafe extern "C" fn() -> i32>(&symbol)
                        .map_err(jit_err)?
                        .call()),
                    [a] => Ok(self
                        .engine
                        .get_function::<unsafe extern "C" fn(i32) -> i32>(&symbol)
                        .map_err(jit_err)?
                        .call(a)),
                    [a, b] => Ok(self
                        .engine
                        .get_function::<unsafe extern "C" fn(i32, i32) -> i32>(&symbol)
                        .map_err(jit_err)?
                        .call(a, b)),
                    [a, b, c] => Ok(self
                        .engine
                        .get_function::<unsafe extern "C" fn(i32, i32, i32) -> i32>(&symbol)
                        .map_err(jit_err)?
                        .call(a, b, c)),
                    _ => Err(CodegenError::Unsupported(format!(
                        "calling '{name}' with {} arguments from the host",
                        args.len()
                    ))),
                }
            }
        })
    }
}

impl Drop for JitSession<'_> {
    fn drop(&mut self) {
        self.arena.release();
    }
}

//! The backend host: takes a lowered LLVM module, runs the single
//! mem-to-register pass, and exposes mangled symbols as callables.

use inkwell::execution_engine::ExecutionEngine;
use inkwell::module::Module as LlvmModule;
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::OptimizationLevel;

use crate::ir::{mangle, InternalError};

pub struct Jit<'a, 'ctx> {
    module: &'a LlvmModule<'ctx>,
    engine: ExecutionEngine<'ctx>,
}

impl<'a, 'ctx> Jit<'a, 'ctx> {
    pub fn new(module: &'a LlvmModule<'ctx>) -> Result<Self, InternalError> {
        Target::initialize_native(&InitializationConfig::default())
            .map_err(|e| jit_error(module, e))?;
        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple)
            .map_err(|e| jit_error(module, e.to_string()))?;
        let machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::None,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| jit_error(module, "No target machine for host".to_string()))?;

        module
            .run_passes("mem2reg", &machine, PassBuilderOptions::create())
            .map_err(|e| jit_error(module, e.to_string()))?;

        let engine = module
            .create_jit_execution_engine(OptimizationLevel::None)
            .map_err(|e| jit_error(module, e.to_string()))?;

        Ok(Jit { module, engine })
    }

    /// Look up a mangled symbol and call it as `fn() -> i32`.
    pub fn run(&self, symbol: &str) -> Result<i32, InternalError> {
        type EntryFn = unsafe extern "C" fn() -> i32;
        let func = unsafe { self.engine.get_function::<EntryFn>(symbol) }
            .map_err(|_| jit_error(self.module, format!("Missing {}", symbol)))?;
        Ok(unsafe { func.call() })
    }

    /// The program entry point: `Main.main`, called with no arguments.
    pub fn run_main(&self) -> Result<i32, InternalError> {
        self.run(&mangle("Main", "main"))
    }
}

fn jit_error(module: &LlvmModule, message: String) -> InternalError {
    InternalError {
        message,
        function_dump: None,
        module_dump: module.print_to_string().to_string(),
    }
}

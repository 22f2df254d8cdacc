//! Declarations of the runtime library
//!
//! Every runtime function is an external declaration in the generated
//! module. The native build links them from `runtime/bbruntime.c`; the JIT
//! maps them onto the host implementations in [`crate::runtime`].

use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::BasicMetadataTypeEnum;

use crate::context::{FunctionSymbol, ValueType};

pub const PRINT: &str = "Print";
pub const WRITE: &str = "Write";
pub const STR_FROM_INT: &str = "bbStrFromInt";
pub const STR_FROM_FLOAT: &str = "bbStrFromFloat";
pub const STR_CONCAT: &str = "bbStrConcat";
pub const STR_COMPARE: &str = "bbStrCompare";

/// One runtime function: symbol, parameters, return type, and whether
/// source code may call it by name.
pub struct RuntimeFunction {
    pub symbol: &'static str,
    pub params: &'static [ValueType],
    pub ret: Option<ValueType>,
    pub callable: bool,
}

/// The runtime surface, in declaration order
pub const RUNTIME_FUNCTIONS: &[RuntimeFunction] = &[
    RuntimeFunction {
        symbol: PRINT,
        params: &[ValueType::Str],
        ret: None,
        callable: true,
    },
    RuntimeFunction {
        symbol: WRITE,
        params: &[ValueType::Str],
        ret: None,
        callable: true,
    },
    RuntimeFunction {
        symbol: STR_FROM_INT,
        params: &[ValueType::Int],
        ret: Some(ValueType::Str),
        callable: false,
    },
    RuntimeFunction {
        symbol: STR_FROM_FLOAT,
        params: &[ValueType::Float],
        ret: Some(ValueType::Str),
        callable: false,
    },
    RuntimeFunction {
        symbol: STR_CONCAT,
        params: &[ValueType::Str, ValueType::Str],
        ret: Some(ValueType::Str),
        callable: false,
    },
    RuntimeFunction {
        symbol: STR_COMPARE,
        params: &[ValueType::Str, ValueType::Str],
        ret: Some(ValueType::Int),
        callable: false,
    },
];

/// Runtime functions visible to source code, matched case-insensitively
pub fn lookup_callable(name: &str) -> Option<&'static RuntimeFunction> {
    RUNTIME_FUNCTIONS
        .iter()
        .find(|f| f.callable && f.symbol.eq_ignore_ascii_case(name))
}

/// Declare every runtime function in `module`.
pub fn declare_runtime<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
) -> Vec<(&'static RuntimeFunction, FunctionSymbol<'ctx>)> {
    RUNTIME_FUNCTIONS
        .iter()
        .map(|func| {
            let params: Vec<BasicMetadataTypeEnum> = func
                .params
                .iter()
                .map(|ty| ty.llvm_type(context).into())
                .collect();
            let fn_type = match func.ret {
                Some(ret) => ret.llvm_type(context).fn_type(&params, false),
                None => context.void_type().fn_type(&params, false),
            };
            let value = module.add_function(func.symbol, fn_type, None);
            let symbol = FunctionSymbol {
                value,
                ret: func.ret,
                params: func.params.to_vec(),
            };
            (func, symbol)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_blitz_names_are_callable() {
        assert_eq!(lookup_callable("print").map(|f| f.symbol), Some(PRINT));
        assert_eq!(lookup_callable("WRITE").map(|f| f.symbol), Some(WRITE));
        assert!(lookup_callable("bbStrConcat").is_none());
    }

    #[test]
    fn test_declarations() {
        let context = Context::create();
        let module = context.create_module("rt");
        let declared = declare_runtime(&context, &module);
        assert_eq!(declared.len(), RUNTIME_FUNCTIONS.len());

        let print = module.get_function(PRINT).expect("Print declared");
        assert_eq!(print.count_params(), 1);
        assert!(print.get_type().get_return_type().is_none());

        let compare = module.get_function(STR_COMPARE).expect("bbStrCompare declared");
        assert_eq!(compare.count_params(), 2);
        assert!(compare.get_type().get_return_type().is_some());
    }
}

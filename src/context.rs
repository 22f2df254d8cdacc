//! Compilation contexts
//!
//! A [`Context`] is one scope's symbol table: the functions it can call and
//! the variable slots it owns. The code generator keeps them on a
//! [`ContextStack`]; the root context holds the program's functions and
//! `bbmain`'s variables, and each function body gets its own context on top.
//!
//! Names are case-insensitive, so every key is stored upper-cased.

use std::collections::HashMap;

use inkwell::types::BasicTypeEnum;
use inkwell::values::{FunctionValue, PointerValue};

/// The value types of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `i32`
    Int,
    /// `f32`
    Float,
    /// Pointer to a NUL-terminated UTF-8 string
    Str,
}

impl ValueType {
    pub fn llvm_type<'ctx>(self, context: &'ctx inkwell::context::Context) -> BasicTypeEnum<'ctx> {
        match self {
            ValueType::Int => context.i32_type().into(),
            ValueType::Float => context.f32_type().into(),
            ValueType::Str => context.ptr_type(inkwell::AddressSpace::default()).into(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "string",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A callable function: user-defined or part of the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol<'ctx> {
    pub value: FunctionValue<'ctx>,
    /// `None` for functions that return nothing (`Print`)
    pub ret: Option<ValueType>,
    pub params: Vec<ValueType>,
}

impl<'ctx> FunctionSymbol<'ctx> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A variable's storage: an `alloca` of a fixed value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: ValueType,
}

/// One scope's symbol table
#[derive(Debug, Default)]
pub struct Context<'ctx> {
    functions: HashMap<String, FunctionSymbol<'ctx>>,
    globals: HashMap<String, Slot<'ctx>>,
}

fn fold(name: &str) -> String {
    name.to_uppercase()
}

impl<'ctx> Context<'ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function; returns the previous symbol with that name.
    pub fn define_function(
        &mut self,
        name: &str,
        symbol: FunctionSymbol<'ctx>,
    ) -> Option<FunctionSymbol<'ctx>> {
        self.functions.insert(fold(name), symbol)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSymbol<'ctx>> {
        self.functions.get(&fold(name))
    }

    /// Bind a variable slot; returns the previous slot with that name.
    pub fn define_variable(&mut self, name: &str, slot: Slot<'ctx>) -> Option<Slot<'ctx>> {
        self.globals.insert(fold(name), slot)
    }

    pub fn variable(&self, name: &str) -> Option<&Slot<'ctx>> {
        self.globals.get(&fold(name))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn variable_count(&self) -> usize {
        self.globals.len()
    }
}

/// The active contexts, innermost last
#[derive(Debug, Default)]
pub struct ContextStack<'ctx> {
    contexts: Vec<Context<'ctx>>,
}

impl<'ctx> ContextStack<'ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, context: Context<'ctx>) {
        self.contexts.push(context);
    }

    /// Remove the current context. `None` when the stack is empty.
    pub fn pop(&mut self) -> Option<Context<'ctx>> {
        self.contexts.pop()
    }

    pub fn current(&self) -> Option<&Context<'ctx>> {
        self.contexts.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Context<'ctx>> {
        self.contexts.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Look a function up from the innermost context outwards
    pub fn resolve_function(&self, name: &str) -> Option<&FunctionSymbol<'ctx>> {
        self.contexts.iter().rev().find_map(|ctx| ctx.function(name))
    }

    /// Look a variable up in the current context only
    pub fn resolve_variable(&self, name: &str) -> Option<&Slot<'ctx>> {
        self.current().and_then(|ctx| ctx.variable(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context as LlvmContext;

    #[test]
    fn test_empty_stack() {
        let mut stack: ContextStack<'_> = ContextStack::new();
        assert!(stack.current().is_none());
        assert!(stack.pop().is_none());
        assert_eq!(stack.depth(), 0);
        assert!(stack.resolve_function("Print").is_none());
    }

    #[test]
    fn test_push_pop_restores_previous() {
        let llvm = LlvmContext::create();
        let module = llvm.create_module("ctx");
        let f = module.add_function("F", llvm.i32_type().fn_type(&[], false), None);

        let mut stack = ContextStack::new();
        let mut root = Context::new();
        root.define_function(
            "F",
            FunctionSymbol {
                value: f,
                ret: Some(ValueType::Int),
                params: Vec::new(),
            },
        );
        stack.push(root);
        stack.push(Context::new());
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current().map(Context::function_count), Some(0));

        let inner = stack.pop();
        assert!(inner.is_some());
        assert_eq!(stack.current().map(Context::function_count), Some(1));
        assert!(stack.pop().is_some());
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_function_lookup_walks_outwards_and_ignores_case() {
        let llvm = LlvmContext::create();
        let module = llvm.create_module("ctx");
        let i32_type = llvm.i32_type();
        let outer_fn = module.add_function("Outer", i32_type.fn_type(&[], false), None);
        let inner_fn =
            module.add_function("Inner", i32_type.fn_type(&[i32_type.into()], false), None);

        let mut stack = ContextStack::new();
        let mut root = Context::new();
        root.define_function(
            "Fib",
            FunctionSymbol {
                value: outer_fn,
                ret: Some(ValueType::Int),
                params: Vec::new(),
            },
        );
        stack.push(root);
        assert_eq!(stack.resolve_function("FIB").map(|s| s.value), Some(outer_fn));

        // an inner definition shadows the outer one until popped
        let mut inner = Context::new();
        inner.define_function(
            "fib",
            FunctionSymbol {
                value: inner_fn,
                ret: Some(ValueType::Int),
                params: vec![ValueType::Int],
            },
        );
        stack.push(inner);
        let found = stack.resolve_function("Fib").cloned();
        assert_eq!(found.as_ref().map(|s| s.value), Some(inner_fn));
        assert_eq!(found.map(|s| s.arity()), Some(1));

        stack.pop();
        assert_eq!(stack.resolve_function("fib").map(|s| s.value), Some(outer_fn));
    }

    #[test]
    fn test_variables_are_scope_local() {
        let llvm = LlvmContext::create();
        let module = llvm.create_module("ctx");
        let f = module.add_function("f", llvm.void_type().fn_type(&[], false), None);
        let builder = llvm.create_builder();
        builder.position_at_end(llvm.append_basic_block(f, "entry"));
        let ptr = builder
            .build_alloca(llvm.i32_type(), "x")
            .expect("alloca");

        let mut stack = ContextStack::new();
        let mut root = Context::new();
        root.define_variable("x", Slot { ptr, ty: ValueType::Int });
        root.define_variable("Привет", Slot { ptr, ty: ValueType::Int });
        assert!(root.variable("пРИВЕТ").is_some());
        assert_eq!(root.variable_count(), 2);
        stack.push(root);
        assert_eq!(stack.resolve_variable("X").map(|s| s.ty), Some(ValueType::Int));

        stack.push(Context::new());
        assert!(stack.resolve_variable("x").is_none());
        stack.pop();
        assert!(stack.resolve_variable("x").is_some());
    }
}

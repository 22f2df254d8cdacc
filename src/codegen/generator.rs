//! AST to LLVM IR lowering
//!
//! The generator walks the program three times: it declares every top-level
//! function (so calls may refer to functions defined further down), lowers
//! the function bodies, and finally lowers the remaining top-level
//! statements into `bbmain`.

use std::collections::HashMap;

use inkwell::builder::Builder;
use inkwell::context::Context as LlvmContext;
use inkwell::intrinsics::Intrinsic;
use inkwell::module::Module;
use inkwell::types::BasicMetadataTypeEnum;
use inkwell::values::{
    BasicMetadataValueEnum, BasicValueEnum, FunctionValue, IntValue, PointerValue,
};
use inkwell::{FloatPredicate, IntPredicate};
use tracing::{debug, trace};

use super::error::{CodegenError, CodegenResult, ResolutionError};
use super::module::{function_symbol, CompiledModule, ENTRY_SYMBOL};
use super::runtime::{self, declare_runtime};
use crate::ast::*;
use crate::context::{Context, ContextStack, FunctionSymbol, Slot, ValueType};

/// A lowered expression and its language type
#[derive(Debug, Clone, Copy)]
struct Value<'ctx> {
    value: BasicValueEnum<'ctx>,
    ty: ValueType,
}

impl<'ctx> Value<'ctx> {
    fn new(value: impl Into<BasicValueEnum<'ctx>>, ty: ValueType) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }
}

/// LLVM code generator for one program
pub struct Generator<'ctx> {
    context: &'ctx LlvmContext,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    /// Runtime declarations by symbol
    runtime: HashMap<&'static str, FunctionSymbol<'ctx>>,
    scopes: ContextStack<'ctx>,
    /// Function whose body is being lowered
    function: Option<FunctionValue<'ctx>>,
}

impl<'ctx> Generator<'ctx> {
    pub fn new(context: &'ctx LlvmContext, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        let runtime = declare_runtime(context, &module)
            .into_iter()
            .map(|(func, symbol)| (func.symbol, symbol))
            .collect();

        Self {
            context,
            module,
            builder,
            runtime,
            scopes: ContextStack::new(),
            function: None,
        }
    }

    /// Lower `program` with `root` as the outermost context.
    ///
    /// The module is verified before it is returned; on any error no module
    /// is produced.
    pub fn generate(
        mut self,
        program: &Program,
        root: Context<'ctx>,
    ) -> CodegenResult<CompiledModule<'ctx>> {
        self.scopes.push(root);

        // First pass: declare all functions
        let mut definitions = Vec::new();
        for stmt in &program.statements {
            if let Stmt::FunctionDef { name, params, body } = stmt {
                let value = self.declare_function(name, params)?;
                definitions.push((value, params, body));
            }
        }
        debug!(
            functions = self.scopes.current().map_or(0, Context::function_count),
            "declared user functions"
        );

        // Second pass: function bodies
        for (value, params, body) in definitions {
            self.lower_function(value, params, body)?;
        }

        // Third pass: everything else goes into bbmain
        self.lower_main(&program.statements)?;
        debug!(
            variables = self.scopes.current().map_or(0, Context::variable_count),
            "lowered bbmain"
        );

        self.module
            .verify()
            .map_err(|e| CodegenError::Verification(e.to_string()))?;
        debug!(module = %self.module.get_name().to_string_lossy(), "module verified");

        Ok(CompiledModule::new(self.module))
    }

    // ============ Functions ============

    fn declare_function(
        &mut self,
        name: &Identifier,
        params: &[Identifier],
    ) -> CodegenResult<FunctionValue<'ctx>> {
        let redefined = self.scopes.resolve_function(&name.name).is_some()
            || runtime::lookup_callable(&name.name).is_some();
        if redefined {
            return Err(CodegenError::Redefinition(name.name.clone()));
        }
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.key() == param.key()) {
                return Err(CodegenError::Redefinition(param.name.clone()));
            }
        }

        let i32_type = self.context.i32_type();
        let param_types: Vec<BasicMetadataTypeEnum> = vec![i32_type.into(); params.len()];
        let value = self.module.add_function(
            &function_symbol(&name.name),
            i32_type.fn_type(&param_types, false),
            None,
        );

        let symbol = FunctionSymbol {
            value,
            ret: Some(ValueType::Int),
            params: vec![ValueType::Int; params.len()],
        };
        self.scopes
            .current_mut()
            .ok_or_else(|| CodegenError::Unsupported("declaring a function without a context".into()))?
            .define_function(&name.name, symbol);
        trace!(name = %name, arity = params.len(), "declared function");

        Ok(value)
    }

    fn lower_function(
        &mut self,
        value: FunctionValue<'ctx>,
        params: &[Identifier],
        body: &Body,
    ) -> CodegenResult<()> {
        let entry = self.context.append_basic_block(value, "entry");
        self.builder.position_at_end(entry);
        self.function = Some(value);
        self.scopes.push(Context::new());

        for (param, arg) in params.iter().zip(value.get_param_iter()) {
            let ptr = self.entry_alloca(ValueType::Int, &param.name)?;
            self.builder.build_store(ptr, arg)?;
            self.define_variable(param, Slot {
                ptr,
                ty: ValueType::Int,
            })?;
        }

        self.lower_body(body)?;
        if !self.block_terminated() {
            let zero = self.context.i32_type().const_zero();
            self.builder.build_return(Some(&zero))?;
        }

        self.scopes.pop();
        self.function = None;
        Ok(())
    }

    fn lower_main(&mut self, statements: &[Stmt]) -> CodegenResult<()> {
        let main = self.module.add_function(
            ENTRY_SYMBOL,
            self.context.void_type().fn_type(&[], false),
            None,
        );
        let entry = self.context.append_basic_block(main, "entry");
        self.builder.position_at_end(entry);
        self.function = Some(main);

        for stmt in statements {
            if !matches!(stmt, Stmt::FunctionDef { .. }) {
                self.lower_stmt(stmt)?;
            }
        }
        if !self.block_terminated() {
            self.builder.build_return(None)?;
        }

        self.function = None;
        Ok(())
    }

    fn current_function(&self) -> CodegenResult<FunctionValue<'ctx>> {
        self.function
            .ok_or_else(|| CodegenError::Unsupported("code outside of a function".into()))
    }

    fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|block| block.get_terminator().is_some())
    }

    /// Allocate a slot at the top of the current function's entry block.
    fn entry_alloca(&self, ty: ValueType, name: &str) -> CodegenResult<PointerValue<'ctx>> {
        let function = self.current_function()?;
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| CodegenError::Unsupported("function without an entry block".into()))?;

        let builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => builder.position_before(&first),
            None => builder.position_at_end(entry),
        }
        Ok(builder.build_alloca(ty.llvm_type(self.context), name)?)
    }

    fn define_variable(&mut self, name: &Identifier, slot: Slot<'ctx>) -> CodegenResult<()> {
        let scope = self
            .scopes
            .current_mut()
            .ok_or_else(|| CodegenError::Unsupported("variables without a context".into()))?;
        if scope.define_variable(&name.name, slot).is_some() {
            return Err(CodegenError::Redefinition(name.name.clone()));
        }
        Ok(())
    }

    // ============ Statements ============

    fn lower_body(&mut self, body: &Body) -> CodegenResult<()> {
        for stmt in &body.statements {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match stmt {
            Stmt::Expr(Expr::UnaryOp {
                op: UnaryOperator::Return,
                operand,
            }) => self.lower_return(operand),
            Stmt::Expr(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
            Stmt::Assign { target, value } => self.lower_assign(target, value),
            Stmt::ProcedureCall { callee, args } => {
                self.lower_call(callee, args)?;
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch),
            Stmt::FunctionDef { name, .. } => Err(CodegenError::Unsupported(format!(
                "nested definition of function '{name}'"
            ))),
        }
    }

    fn lower_assign(&mut self, target: &Identifier, value: &Expr) -> CodegenResult<()> {
        let value = self.lower_expr(value)?;
        let slot = match self.scopes.resolve_variable(&target.name) {
            Some(slot) => *slot,
            None => {
                let slot = Slot {
                    ptr: self.entry_alloca(value.ty, &target.name)?,
                    ty: value.ty,
                };
                self.define_variable(target, slot)?;
                slot
            }
        };
        let value = self.convert(value, slot.ty, &format!("assignment to '{target}'"))?;
        self.builder.build_store(slot.ptr, value.value)?;
        Ok(())
    }

    fn lower_return(&mut self, operand: &Expr) -> CodegenResult<()> {
        let function = self.current_function()?;
        let value = self.lower_expr(operand)?;

        if function.get_type().get_return_type().is_some() {
            let value = self.convert(value, ValueType::Int, "RETURN")?;
            self.builder.build_return(Some(&value.value))?;
        } else {
            // bbmain evaluates the value and stops
            self.builder.build_return(None)?;
        }

        // anything after the return lands in an unreachable block
        let rest = self.context.append_basic_block(function, "after_return");
        self.builder.position_at_end(rest);
        Ok(())
    }

    fn lower_if(&mut self, condition: &Expr, then_branch: &Body, else_branch: &Body) -> CodegenResult<()> {
        let function = self.current_function()?;
        let condition = self.lower_expr(condition)?;
        let truth = self.truthiness(condition, "IF condition")?;

        let then_bb = self.context.append_basic_block(function, "then");
        let else_bb = (!else_branch.is_empty()).then(|| self.context.append_basic_block(function, "else"));
        let merge_bb = self.context.append_basic_block(function, "endif");

        self.builder
            .build_conditional_branch(truth, then_bb, else_bb.unwrap_or(merge_bb))?;

        self.builder.position_at_end(then_bb);
        self.lower_body(then_branch)?;
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(merge_bb)?;
        }

        if let Some(else_bb) = else_bb {
            self.builder.position_at_end(else_bb);
            self.lower_body(else_branch)?;
            if !self.block_terminated() {
                self.builder.build_unconditional_branch(merge_bb)?;
            }
        }

        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    // ============ Expressions ============

    fn lower_expr(&mut self, expr: &Expr) -> CodegenResult<Value<'ctx>> {
        match expr {
            Expr::IntLiteral(value) => {
                let int = self.context.i32_type().const_int(*value as u64, true);
                Ok(Value::new(int, ValueType::Int))
            }
            Expr::FloatLiteral(value) => {
                let float = self.context.f32_type().const_float(f64::from(value.value()));
                Ok(Value::new(float, ValueType::Float))
            }
            Expr::StringLiteral(text) => {
                // one private global per occurrence
                let global = self.builder.build_global_string_ptr(text, "str")?;
                Ok(Value::new(global.as_pointer_value(), ValueType::Str))
            }
            Expr::Identifier(ident) => {
                let slot = *self
                    .scopes
                    .resolve_variable(&ident.name)
                    .ok_or_else(|| ResolutionError::UnknownIdentifier(ident.name.clone()))?;
                let value = self
                    .builder
                    .build_load(slot.ty.llvm_type(self.context), slot.ptr, &ident.name)?;
                Ok(Value::new(value, slot.ty))
            }
            Expr::UnaryOp { op, operand } => self.lower_unary(*op, operand),
            Expr::BinaryOp { op, left, right } => self.lower_binary(*op, left, right),
            Expr::FunctionCall { callee, args } => self
                .lower_call(callee, args)?
                .ok_or_else(|| {
                    CodegenError::Unsupported(format!("using the result of '{callee}'"))
                }),
        }
    }

    fn lower_unary(&mut self, op: UnaryOperator, operand: &Expr) -> CodegenResult<Value<'ctx>> {
        match op {
            UnaryOperator::Before
            | UnaryOperator::After
            | UnaryOperator::New
            | UnaryOperator::First
            | UnaryOperator::Last => {
                return Err(CodegenError::Unsupported(format!("{op} (user-defined types)")))
            }
            UnaryOperator::Return => {
                return Err(CodegenError::Unsupported("RETURN inside an expression".into()))
            }
            _ => {}
        }

        let value = self.lower_expr(operand)?;
        match op {
            UnaryOperator::Neg => match value.ty {
                ValueType::Int => {
                    let neg = self.builder.build_int_neg(value.value.into_int_value(), "neg")?;
                    Ok(Value::new(neg, ValueType::Int))
                }
                ValueType::Float => {
                    let neg = self
                        .builder
                        .build_float_neg(value.value.into_float_value(), "fneg")?;
                    Ok(Value::new(neg, ValueType::Float))
                }
                ValueType::Str => Err(mismatch("unary -", ValueType::Int, value.ty)),
            },
            UnaryOperator::Plus => match value.ty {
                ValueType::Str => Err(mismatch("unary +", ValueType::Int, value.ty)),
                _ => Ok(value),
            },
            UnaryOperator::Complement => {
                let int = self.convert(value, ValueType::Int, "~")?;
                let not = self.builder.build_not(int.value.into_int_value(), "compl")?;
                Ok(Value::new(not, ValueType::Int))
            }
            UnaryOperator::Not => {
                let truth = self.truthiness(value, "NOT")?;
                let not = self.builder.build_not(truth, "not")?;
                self.bool_to_int(not)
            }
            UnaryOperator::Int => self.convert(value, ValueType::Int, "INT"),
            UnaryOperator::Float => self.convert(value, ValueType::Float, "FLOAT"),
            UnaryOperator::Str => self.convert(value, ValueType::Str, "STR"),
            // rejected above
            _ => Err(CodegenError::Unsupported(op.to_string())),
        }
    }

    fn lower_binary(
        &mut self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
    ) -> CodegenResult<Value<'ctx>> {
        let lhs = self.lower_expr(left)?;
        let rhs = self.lower_expr(right)?;
        let has_str = lhs.ty == ValueType::Str || rhs.ty == ValueType::Str;
        let context = op.as_str();

        if op.is_comparison() {
            return if has_str {
                self.compare_strings(op, lhs, rhs)
            } else {
                self.compare_numbers(op, lhs, rhs)
            };
        }

        match op {
            BinaryOperator::Add if has_str => {
                let lhs = self.convert(lhs, ValueType::Str, context)?;
                let rhs = self.convert(rhs, ValueType::Str, context)?;
                let joined = self.call_runtime(runtime::STR_CONCAT, &[lhs.value, rhs.value])?;
                Ok(Value::new(joined, ValueType::Str))
            }
            BinaryOperator::And
            | BinaryOperator::Or
            | BinaryOperator::Xor
            | BinaryOperator::Shl
            | BinaryOperator::Shr
            | BinaryOperator::Sar => {
                let l = self.convert(lhs, ValueType::Int, context)?.value.into_int_value();
                let r = self.convert(rhs, ValueType::Int, context)?.value.into_int_value();
                let result = match op {
                    BinaryOperator::And => self.builder.build_and(l, r, "and")?,
                    BinaryOperator::Or => self.builder.build_or(l, r, "or")?,
                    BinaryOperator::Xor => self.builder.build_xor(l, r, "xor")?,
                    BinaryOperator::Shl => self.builder.build_left_shift(l, r, "shl")?,
                    BinaryOperator::Shr => self.builder.build_right_shift(l, r, false, "shr")?,
                    _ => self.builder.build_right_shift(l, r, true, "sar")?,
                };
                Ok(Value::new(result, ValueType::Int))
            }
            BinaryOperator::Pow => {
                let l = self.convert(lhs, ValueType::Float, context)?;
                let r = self.convert(rhs, ValueType::Float, context)?;
                let pow = self.pow_intrinsic()?;
                let args: [BasicMetadataValueEnum; 2] = [l.value.into(), r.value.into()];
                let result = self
                    .builder
                    .build_call(pow, &args, "pow")?
                    .try_as_basic_value()
                    .left()
                    .ok_or_else(|| CodegenError::Unsupported("llvm.pow without a result".into()))?;
                Ok(Value::new(result, ValueType::Float))
            }
            _ => {
                let ty = self.arithmetic_type(lhs, rhs, context)?;
                let l = self.convert(lhs, ty, context)?.value;
                let r = self.convert(rhs, ty, context)?.value;
                let result: BasicValueEnum<'ctx> = if ty == ValueType::Int {
                    let (l, r) = (l.into_int_value(), r.into_int_value());
                    match op {
                        BinaryOperator::Add => self.builder.build_int_add(l, r, "add")?,
                        BinaryOperator::Sub => self.builder.build_int_sub(l, r, "sub")?,
                        BinaryOperator::Mul => self.builder.build_int_mul(l, r, "mul")?,
                        BinaryOperator::Div => self.builder.build_int_signed_div(l, r, "div")?,
                        _ => self.builder.build_int_signed_rem(l, r, "mod")?,
                    }
                    .into()
                } else {
                    let (l, r) = (l.into_float_value(), r.into_float_value());
                    match op {
                        BinaryOperator::Add => self.builder.build_float_add(l, r, "fadd")?,
                        BinaryOperator::Sub => self.builder.build_float_sub(l, r, "fsub")?,
                        BinaryOperator::Mul => self.builder.build_float_mul(l, r, "fmul")?,
                        BinaryOperator::Div => self.builder.build_float_div(l, r, "fdiv")?,
                        _ => self.builder.build_float_rem(l, r, "fmod")?,
                    }
                    .into()
                };
                Ok(Value::new(result, ty))
            }
        }
    }

    /// The common numeric type of two operands: float wins over int
    fn arithmetic_type(&self, lhs: Value<'ctx>, rhs: Value<'ctx>, context: &str) -> CodegenResult<ValueType> {
        match (lhs.ty, rhs.ty) {
            (ValueType::Str, _) | (_, ValueType::Str) => {
                Err(mismatch(context, ValueType::Int, ValueType::Str))
            }
            (ValueType::Float, _) | (_, ValueType::Float) => Ok(ValueType::Float),
            _ => Ok(ValueType::Int),
        }
    }

    fn compare_numbers(
        &mut self,
        op: BinaryOperator,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
    ) -> CodegenResult<Value<'ctx>> {
        let context = op.as_str();
        let ty = self.arithmetic_type(lhs, rhs, context)?;
        let l = self.convert(lhs, ty, context)?.value;
        let r = self.convert(rhs, ty, context)?.value;

        let flag = if ty == ValueType::Int {
            self.builder.build_int_compare(
                int_predicate(op),
                l.into_int_value(),
                r.into_int_value(),
                "cmp",
            )?
        } else {
            self.builder.build_float_compare(
                float_predicate(op),
                l.into_float_value(),
                r.into_float_value(),
                "fcmp",
            )?
        };
        self.bool_to_int(flag)
    }

    /// String comparison: `bbStrCompare(l, r) <op> 0`
    fn compare_strings(
        &mut self,
        op: BinaryOperator,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
    ) -> CodegenResult<Value<'ctx>> {
        let context = op.as_str();
        let l = self.convert(lhs, ValueType::Str, context)?;
        let r = self.convert(rhs, ValueType::Str, context)?;
        let order = self
            .call_runtime(runtime::STR_COMPARE, &[l.value, r.value])?
            .into_int_value();
        let zero = self.context.i32_type().const_zero();
        let flag = self
            .builder
            .build_int_compare(int_predicate(op), order, zero, "strcmp")?;
        self.bool_to_int(flag)
    }

    fn bool_to_int(&self, flag: IntValue<'ctx>) -> CodegenResult<Value<'ctx>> {
        let int = self
            .builder
            .build_int_z_extend(flag, self.context.i32_type(), "bool")?;
        Ok(Value::new(int, ValueType::Int))
    }

    /// Nonzero test, as an `i1`
    fn truthiness(&self, value: Value<'ctx>, context: &str) -> CodegenResult<IntValue<'ctx>> {
        match value.ty {
            ValueType::Int => {
                let int = value.value.into_int_value();
                let zero = int.get_type().const_zero();
                Ok(self
                    .builder
                    .build_int_compare(IntPredicate::NE, int, zero, "truth")?)
            }
            ValueType::Float => {
                let float = value.value.into_float_value();
                let zero = float.get_type().const_zero();
                Ok(self
                    .builder
                    .build_float_compare(FloatPredicate::ONE, float, zero, "truth")?)
            }
            ValueType::Str => Err(mismatch(context, ValueType::Int, ValueType::Str)),
        }
    }

    /// Implicit conversion between value types
    fn convert(&mut self, value: Value<'ctx>, to: ValueType, context: &str) -> CodegenResult<Value<'ctx>> {
        let converted: BasicValueEnum<'ctx> = match (value.ty, to) {
            (from, to) if from == to => return Ok(value),
            (ValueType::Int, ValueType::Float) => self
                .builder
                .build_signed_int_to_float(
                    value.value.into_int_value(),
                    self.context.f32_type(),
                    "itof",
                )?
                .into(),
            (ValueType::Float, ValueType::Int) => self
                .builder
                .build_float_to_signed_int(
                    value.value.into_float_value(),
                    self.context.i32_type(),
                    "ftoi",
                )?
                .into(),
            (ValueType::Int, ValueType::Str) => {
                self.call_runtime(runtime::STR_FROM_INT, &[value.value])?
            }
            (ValueType::Float, ValueType::Str) => {
                self.call_runtime(runtime::STR_FROM_FLOAT, &[value.value])?
            }
            (from, to) => return Err(mismatch(context, to, from)),
        };
        Ok(Value::new(converted, to))
    }

    // ============ Calls ============

    /// Lower a call; `None` when the callee returns nothing.
    fn lower_call(&mut self, callee: &Identifier, args: &[Expr]) -> CodegenResult<Option<Value<'ctx>>> {
        let symbol = match self.scopes.resolve_function(&callee.name) {
            Some(symbol) => symbol.clone(),
            None => runtime::lookup_callable(&callee.name)
                .and_then(|func| self.runtime.get(func.symbol))
                .cloned()
                .ok_or_else(|| ResolutionError::UnknownFunction(callee.name.clone()))?,
        };

        if symbol.arity() != args.len() {
            return Err(CodegenError::Arity {
                name: callee.name.clone(),
                expected: symbol.arity(),
                found: args.len(),
            });
        }

        let mut values: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for (arg, &ty) in args.iter().zip(&symbol.params) {
            let value = self.lower_expr(arg)?;
            let value = self.convert(value, ty, &format!("argument to '{callee}'"))?;
            values.push(value.value.into());
        }

        let call = self.builder.build_call(symbol.value, &values, "call")?;
        Ok(match (call.try_as_basic_value().left(), symbol.ret) {
            (Some(value), Some(ty)) => Some(Value::new(value, ty)),
            _ => None,
        })
    }

    fn call_runtime(
        &mut self,
        name: &'static str,
        args: &[BasicValueEnum<'ctx>],
    ) -> CodegenResult<BasicValueEnum<'ctx>> {
        let function = self
            .runtime
            .get(name)
            .map(|symbol| symbol.value)
            .ok_or_else(|| ResolutionError::UnknownFunction(name.to_string()))?;
        let args: Vec<BasicMetadataValueEnum> = args.iter().map(|&a| a.into()).collect();
        self.builder
            .build_call(function, &args, name)?
            .try_as_basic_value()
            .left()
            .ok_or_else(|| CodegenError::Unsupported(format!("using the result of '{name}'")))
    }

    fn pow_intrinsic(&self) -> CodegenResult<FunctionValue<'ctx>> {
        Intrinsic::find("llvm.pow")
            .and_then(|pow| pow.get_declaration(&self.module, &[self.context.f32_type().into()]))
            .ok_or_else(|| CodegenError::Unsupported("llvm.pow intrinsic".into()))
    }
}

fn mismatch(context: &str, expected: ValueType, found: ValueType) -> CodegenError {
    CodegenError::TypeMismatch {
        context: context.to_string(),
        expected,
        found,
    }
}

fn int_predicate(op: BinaryOperator) -> IntPredicate {
    match op {
        BinaryOperator::Eq => IntPredicate::EQ,
        BinaryOperator::Ne => IntPredicate::NE,
        BinaryOperator::Lt => IntPredicate::SLT,
        BinaryOperator::Gt => IntPredicate::SGT,
        BinaryOperator::Le => IntPredicate::SLE,
        _ => IntPredicate::SGE,
    }
}

fn float_predicate(op: BinaryOperator) -> FloatPredicate {
    match op {
        BinaryOperator::Eq => FloatPredicate::OEQ,
        BinaryOperator::Ne => FloatPredicate::UNE,
        BinaryOperator::Lt => FloatPredicate::OLT,
        BinaryOperator::Gt => FloatPredicate::OGT,
        BinaryOperator::Le => FloatPredicate::OLE,
        _ => FloatPredicate::OGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn generate_ir(source: &str) -> CodegenResult<String> {
        let program = parse(source).expect("source parses");
        let llvm = LlvmContext::create();
        let module = Generator::new(&llvm, "test").generate(&program, Context::new())?;
        Ok(module.ir())
    }

    fn generate_err(source: &str) -> CodegenError {
        match generate_ir(source) {
            Ok(ir) => panic!("Expected an error for {source:?}, got:\n{ir}"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_empty_program_has_bbmain() {
        let ir = generate_ir("").expect("empty program compiles");
        assert!(ir.contains("define void @bbmain()"));
        assert!(ir.contains("declare void @Print(ptr)"));
    }

    #[test]
    fn test_every_string_literal_gets_a_global() {
        let ir = generate_ir("Print \"hi\"\nPrint \"hi\"\nPrint \"there\"").expect("compiles");
        let globals = ir
            .lines()
            .filter(|line| line.starts_with('@') && line.contains("c\""))
            .count();
        assert_eq!(globals, 3);
    }

    #[test]
    fn test_functions_are_declared_before_use() {
        let ir = generate_ir("Print Later(2)\nFunction Later(x)\nReturn x * 2\nEnd Function")
            .expect("forward call compiles");
        assert!(ir.contains("define i32 @_flater(i32"));
        assert!(ir.contains("call i32 @_flater("));
    }

    #[test]
    fn test_numbers_convert_for_print() {
        let ir = generate_ir("x = 1\ny = 2.5\nPrint x\nPrint y + x").expect("compiles");
        assert!(ir.contains("@bbStrFromInt"));
        assert!(ir.contains("@bbStrFromFloat"));
        assert!(ir.contains("sitofp"));
    }

    #[test]
    fn test_string_operators_use_runtime() {
        let ir = generate_ir("a = \"x\" + 1\nIf a = \"x1\" Then Print a").expect("compiles");
        assert!(ir.contains("call ptr @bbStrConcat"));
        assert!(ir.contains("call i32 @bbStrCompare"));
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = generate_err("Print y");
        assert!(matches!(
            err,
            CodegenError::Resolution(ResolutionError::UnknownIdentifier(ref name)) if name == "y"
        ));
    }

    #[test]
    fn test_unknown_function() {
        let err = generate_err("Frobnicate 1");
        assert_eq!(err.to_string(), "Unknown function 'Frobnicate'");
    }

    #[test]
    fn test_function_locals_do_not_see_main() {
        let err = generate_err("x = 1\nFunction F()\nReturn x\nEnd Function");
        assert!(matches!(
            err,
            CodegenError::Resolution(ResolutionError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = generate_err("Function Add(a, b)\nReturn a + b\nEnd Function\nPrint Add(1)");
        assert!(matches!(err, CodegenError::Arity { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_redefinitions() {
        let err = generate_err("Function F()\nEnd Function\nFunction f()\nEnd Function");
        assert!(matches!(err, CodegenError::Redefinition(ref name) if name == "f"));

        let err = generate_err("Function G(a, A)\nEnd Function");
        assert!(matches!(err, CodegenError::Redefinition(_)));

        let err = generate_err("Function Print(a)\nEnd Function");
        assert!(matches!(err, CodegenError::Redefinition(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let err = generate_err("x = 1\nx = \"text\"");
        assert!(matches!(
            err,
            CodegenError::TypeMismatch {
                expected: ValueType::Int,
                found: ValueType::Str,
                ..
            }
        ));
        assert!(matches!(generate_err("x = -\"a\""), CodegenError::TypeMismatch { .. }));
    }

    #[test]
    fn test_type_operators_are_unsupported() {
        assert!(matches!(generate_err("p = NEW Player"), CodegenError::Unsupported(_)));
        assert!(matches!(generate_err("x = 1 + RETURN 2"), CodegenError::Unsupported(_)));
    }

    #[test]
    fn test_code_after_return_verifies() {
        let ir = generate_ir("Function F(n)\nReturn n\nPrint \"never\"\nEnd Function")
            .expect("code after RETURN still verifies");
        assert!(ir.contains("after_return"));
    }

    #[test]
    fn test_float_not_equal_is_unordered() {
        let ir = generate_ir("y = 1.5\nx = y <> 2.5").expect("compiles");
        assert!(ir.contains("fcmp une"));
        assert!(!ir.contains("fcmp one"));
    }

    #[test]
    fn test_power_uses_intrinsic() {
        let ir = generate_ir("x = 2 ^ 3").expect("compiles");
        assert!(ir.contains("@llvm.pow.f32"));
    }
}

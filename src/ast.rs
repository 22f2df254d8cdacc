//! Abstract Syntax Tree (AST) for the Blitz3D dialect
//!
//! Nodes are plain immutable values: equality and hashing are structural
//! (derived), so two separately parsed trees compare equal whenever they
//! have the same shape. Positions are not stored in the tree.
//!
//! `Display` is the pretty-printer. Its output parses back to an equal tree
//! for every statement form the parser produces.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A complete program (compilation unit); always the parse root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    /// Top-level function definitions, in source order
    pub fn functions(&self) -> impl Iterator<Item = &Stmt> {
        self.statements
            .iter()
            .filter(|stmt| matches!(stmt, Stmt::FunctionDef { .. }))
    }
}

/// A statement sequence nested inside `IF` or `FUNCTION`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Body {
    pub statements: Vec<Stmt>,
}

impl Body {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// A name as written in the source.
///
/// The language is case-insensitive; [`Identifier::key`] is the folded form
/// used for symbol lookup while `name` keeps the original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn key(&self) -> String {
        self.name.to_uppercase()
    }
}

/// A 32-bit float literal, compared and hashed by bit pattern
#[derive(Debug, Clone, Copy)]
pub struct Float(pub f32);

impl Float {
    pub fn value(self) -> f32 {
        self.0
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Float {}

impl Hash for Float {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.to_string();
        // keep a decimal point so the literal lexes as a float again
        if text.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
            write!(f, "{text}.0")
        } else {
            f.write_str(&text)
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `~x` (bitwise complement)
    Complement,
    /// `NOT x` (logical, yields 0 or 1)
    Not,
    /// `INT x`
    Int,
    /// `FLOAT x`
    Float,
    /// `STR x`
    Str,
    Before,
    After,
    New,
    First,
    Last,
    /// `RETURN x`
    Return,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Complement => "~",
            UnaryOperator::Not => "NOT",
            UnaryOperator::Int => "INT",
            UnaryOperator::Float => "FLOAT",
            UnaryOperator::Str => "STR",
            UnaryOperator::Before => "BEFORE",
            UnaryOperator::After => "AFTER",
            UnaryOperator::New => "NEW",
            UnaryOperator::First => "FIRST",
            UnaryOperator::Last => "LAST",
            UnaryOperator::Return => "RETURN",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Shl,
    Shr,
    Sar,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Xor => "XOR",
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Le => "<=",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Shl => "SHL",
            BinaryOperator::Shr => "SHR",
            BinaryOperator::Sar => "SAR",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "MOD",
            BinaryOperator::Pow => "^",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Gt
                | BinaryOperator::Le
                | BinaryOperator::Ge
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    IntLiteral(i32),
    FloatLiteral(Float),
    StringLiteral(String),
    Identifier(Identifier),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Parenthesised call in expression position: `Fib(n - 1)`
    FunctionCall {
        callee: Identifier,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn int(value: i32) -> Self {
        Expr::IntLiteral(value)
    }

    pub fn float(value: f32) -> Self {
        Expr::FloatLiteral(Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::StringLiteral(value.into())
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(Identifier::new(name))
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall {
            callee: Identifier::new(callee),
            args,
        }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// A bare expression, evaluated for its effect (`RETURN x`, `10`)
    Expr(Expr),
    Assign {
        target: Identifier,
        value: Expr,
    },
    /// Call in statement position, no parentheses: `Print "hi", 2`
    ProcedureCall {
        callee: Identifier,
        args: Vec<Expr>,
    },
    /// `else_branch` is empty when there is no `ELSE`
    If {
        condition: Expr,
        then_branch: Body,
        else_branch: Body,
    },
    FunctionDef {
        name: Identifier,
        params: Vec<Identifier>,
        body: Body,
    },
}

impl Stmt {
    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            target: Identifier::new(target),
            value,
        }
    }

    pub fn procedure(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Stmt::ProcedureCall {
            callee: Identifier::new(callee),
            args,
        }
    }
}

// ============ Pretty printing ============

/// Indentation of one nesting level
pub const INDENT: usize = 2;

struct Separated<'a, T>(&'a [T], &'static str);

impl<T: fmt::Display> fmt::Display for Separated<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(self.1)?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntLiteral(value) => write!(f, "{value}"),
            Expr::FloatLiteral(value) => write!(f, "{value}"),
            Expr::StringLiteral(value) => write!(f, "\"{value}\""),
            Expr::Identifier(ident) => write!(f, "{ident}"),
            // NOT sits below the arithmetic levels and RETURN takes a whole
            // expression, so both need their own parens
            Expr::UnaryOp {
                op: op @ (UnaryOperator::Not | UnaryOperator::Return),
                operand,
            } => write!(f, "({op} {operand})"),
            Expr::UnaryOp { op, operand } => write!(f, "{op} {operand}"),
            Expr::BinaryOp { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::FunctionCall { callee, args } => {
                write!(f, "{callee}({})", Separated(args, ", "))
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Expr(Expr::UnaryOp {
                op: UnaryOperator::Return,
                operand,
            }) => write!(f, "RETURN {operand}"),
            Stmt::Expr(expr) => write!(f, "{expr}"),
            Stmt::Assign { target, value } => write!(f, "{target} = {value}"),
            Stmt::ProcedureCall { callee, args } if args.is_empty() => write!(f, "{callee}"),
            Stmt::ProcedureCall { callee, args } => {
                write!(f, "{callee} {}", Separated(args, ", "))
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                writeln!(f, "IF {condition}")?;
                if !then_branch.is_empty() {
                    writeln!(f, "{then_branch}")?;
                }
                if !else_branch.is_empty() {
                    writeln!(f, "ELSE")?;
                    writeln!(f, "{else_branch}")?;
                }
                f.write_str("ENDIF")
            }
            Stmt::FunctionDef { name, params, body } => {
                writeln!(f, "FUNCTION {name}({})", Separated(params, ", "))?;
                if !body.is_empty() {
                    writeln!(f, "{body}")?;
                }
                f.write_str("END FUNCTION")
            }
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = " ".repeat(INDENT);
        let mut first = true;
        for stmt in &self.statements {
            for line in stmt.to_string().lines() {
                if !first {
                    f.write_str("\n")?;
                }
                first = false;
                write!(f, "{pad}{line}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Separated(&self.statements, "\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn sample() -> Stmt {
        Stmt::If {
            condition: Expr::binary(BinaryOperator::Lt, Expr::ident("n"), Expr::int(2)),
            then_branch: Body::new(vec![Stmt::Expr(Expr::unary(
                UnaryOperator::Return,
                Expr::ident("n"),
            ))]),
            else_branch: Body::empty(),
        }
    }

    #[test]
    fn test_structural_equality() {
        let a = sample();
        let b = sample();
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(Expr::int(1), Expr::float(1.0));
        assert_ne!(Expr::ident("a"), Expr::string("a"));
    }

    #[test]
    fn test_nodes_as_set_keys() {
        let mut set = HashSet::new();
        set.insert(Expr::float(0.5));
        set.insert(Expr::float(0.5));
        set.insert(Expr::call("Fib", vec![Expr::int(5)]));
        set.insert(Expr::call("Fib", vec![Expr::int(5)]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_float_display_keeps_point() {
        assert_eq!(Float(2.0).to_string(), "2.0");
        assert_eq!(Float(15.5).to_string(), "15.5");
        assert_eq!(Float(0.6).to_string(), "0.6");
    }

    #[test]
    fn test_expression_display() {
        let expr = Expr::binary(
            BinaryOperator::Add,
            Expr::int(1),
            Expr::binary(BinaryOperator::Mul, Expr::int(2), Expr::ident("x")),
        );
        assert_eq!(expr.to_string(), "(1 + (2 * x))");
        assert_eq!(
            Expr::unary(UnaryOperator::Neg, Expr::int(3)).to_string(),
            "- 3"
        );
        assert_eq!(
            Expr::unary(UnaryOperator::Not, Expr::ident("a")).to_string(),
            "(NOT a)"
        );
        let nested = Expr::binary(
            BinaryOperator::Add,
            Expr::unary(UnaryOperator::Return, Expr::ident("a")),
            Expr::ident("b"),
        );
        assert_eq!(nested.to_string(), "((RETURN a) + b)");
        assert_eq!(
            Expr::call("Max", vec![Expr::int(1), Expr::string("s")]).to_string(),
            "Max(1, \"s\")"
        );
    }

    #[test]
    fn test_procedure_call_display() {
        let call = Stmt::procedure(
            "MyFunc",
            vec![Expr::int(10), Expr::float(15.5), Expr::string("abacaba")],
        );
        assert_eq!(call.to_string(), "MyFunc 10, 15.5, \"abacaba\"");
        assert_eq!(Stmt::procedure("Stop", vec![]).to_string(), "Stop");
    }

    #[test]
    fn test_block_display_indents() {
        let program = Program::new(vec![Stmt::FunctionDef {
            name: Identifier::new("Sign"),
            params: vec![Identifier::new("n")],
            body: Body::new(vec![
                Stmt::If {
                    condition: Expr::binary(BinaryOperator::Lt, Expr::ident("n"), Expr::int(0)),
                    then_branch: Body::new(vec![Stmt::Expr(Expr::unary(
                        UnaryOperator::Return,
                        Expr::unary(UnaryOperator::Neg, Expr::int(1)),
                    ))]),
                    else_branch: Body::new(vec![Stmt::assign("n", Expr::int(1))]),
                },
                Stmt::Expr(Expr::unary(UnaryOperator::Return, Expr::ident("n"))),
            ]),
        }]);

        let expected = "\
FUNCTION Sign(n)
  IF (n < 0)
    RETURN - 1
  ELSE
    n = 1
  ENDIF
  RETURN n
END FUNCTION";
        assert_eq!(program.to_string(), expected);
    }

    #[test]
    fn test_identifier_key_folds_case() {
        assert_eq!(Identifier::new("MyFunc").key(), "MYFUNC");
        assert_ne!(Identifier::new("MyFunc"), Identifier::new("MYFUNC"));
    }
}

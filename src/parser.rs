//! Parser for the Blitz3D dialect
//!
//! A recursive descent parser over the strict token stream. Each precedence
//! level of the expression grammar has its own method, loosest first, and the
//! first unexpected token aborts the parse.

use crate::ast::*;
use crate::lexer::{self, LexErrors};
use crate::span::Position;
use crate::token::{Token, TokenKind};
use thiserror::Error;
use tracing::debug;

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The source did not lex; no parsing was attempted
    #[error(transparent)]
    Lexical(#[from] LexErrors),

    #[error("Unexpected {kind} '{text}' at {position}")]
    UnexpectedToken {
        kind: TokenKind,
        text: String,
        position: Position,
    },

    #[error("Unexpected EOF")]
    UnexpectedEof,
}

impl ParseError {
    /// Where the error was found, if it has a single location
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::Lexical(errors) => errors.errors().first().map(|e| e.position()),
            ParseError::UnexpectedToken { position, .. } => Some(*position),
            ParseError::UnexpectedEof => None,
        }
    }
}

/// Parse result
pub type ParseResult<T> = Result<T, ParseError>;

/// The parser for the Blitz3D dialect
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting depth of blocks; `FUNCTION` is only valid at depth 0
    depth: usize,
}

impl Parser {
    /// Create a parser over a token stream.
    ///
    /// An `Eof` token is appended if the stream does not end with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let (position, span) = tokens
                .last()
                .map(|t| {
                    (
                        Position::new(t.line, t.column + t.text.chars().count() as u32),
                        crate::span::Span::new(t.span.end, t.span.end),
                    )
                })
                .unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", position, span));
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Advance to next token
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    /// Peek at the nth token ahead (0 = current, 1 = next, etc.)
    fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    /// Check if current token matches
    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Consume token if it matches, otherwise error
    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    /// Consume token if it matches
    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Error for the current token
    fn unexpected(&self) -> ParseError {
        unexpected_token(self.current())
    }

    fn skip_newlines(&mut self) {
        while self.consume(TokenKind::Newline) {}
    }

    // ============ Top-level parsing ============

    /// Parse a whole program
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
            if !self.is_at_end() {
                self.expect(TokenKind::Newline)?;
            }
        }
        Ok(Program::new(statements))
    }

    /// Parse statements up to (not including) a body terminator
    fn parse_body(&mut self) -> ParseResult<Body> {
        self.depth += 1;
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_body_end() {
                break;
            }
            statements.push(self.parse_statement()?);
            if !self.at_body_end() {
                self.expect(TokenKind::Newline)?;
            }
        }
        self.depth -= 1;
        Ok(Body::new(statements))
    }

    fn at_body_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Else | TokenKind::ElseIf | TokenKind::EndIf | TokenKind::End | TokenKind::Eof
        )
    }

    // ============ Statements ============

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.current().kind {
            TokenKind::Function if self.depth == 0 => self.parse_function(),
            TokenKind::If => self.parse_if(),
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::Eq => {
                let target = self.parse_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign { target, value })
            }
            TokenKind::Identifier => {
                let callee = self.parse_ident()?;
                let args = if self.current().kind.ends_statement() {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Ok(Stmt::ProcedureCall { callee, args })
            }
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    /// `FUNCTION name(params) NEWLINE body END FUNCTION`
    fn parse_function(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Function)?;
        let name = self.parse_ident()?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_ident()?);
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Newline)?;

        let body = self.parse_body()?;
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::Function)?;

        Ok(Stmt::FunctionDef { name, params, body })
    }

    /// Both `IF` forms. A newline after the condition selects the block form.
    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::If)?;
        self.parse_if_tail()
    }

    /// Everything after `IF`/`ELSEIF`
    fn parse_if_tail(&mut self) -> ParseResult<Stmt> {
        let condition = self.parse_expr()?;
        self.consume(TokenKind::Then);

        if !self.check(TokenKind::Newline) {
            return self.parse_single_line_if(condition);
        }

        let then_branch = self.parse_body()?;
        let else_branch = match self.current().kind {
            TokenKind::ElseIf => {
                self.advance();
                // the nested IF owns the closing ENDIF
                self.depth += 1;
                let nested = self.parse_if_tail()?;
                self.depth -= 1;
                return Ok(Stmt::If {
                    condition,
                    then_branch,
                    else_branch: Body::new(vec![nested]),
                });
            }
            TokenKind::Else => {
                self.advance();
                self.parse_body()?
            }
            _ => Body::empty(),
        };
        self.parse_endif()?;

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `IF cond THEN stmt ELSE stmt` on one line
    fn parse_single_line_if(&mut self, condition: Expr) -> ParseResult<Stmt> {
        self.depth += 1;
        let then_stmt = self.parse_statement()?;
        let else_branch = if self.consume(TokenKind::Else) {
            Body::new(vec![self.parse_statement()?])
        } else {
            Body::empty()
        };
        self.depth -= 1;

        Ok(Stmt::If {
            condition,
            then_branch: Body::new(vec![then_stmt]),
            else_branch,
        })
    }

    /// `ENDIF` or `END IF`
    fn parse_endif(&mut self) -> ParseResult<()> {
        if self.consume(TokenKind::EndIf) {
            return Ok(());
        }
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::If)?;
        Ok(())
    }

    fn parse_ident(&mut self) -> ParseResult<Identifier> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Identifier::new(token.text))
    }

    fn parse_expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.consume(TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    // ============ Expressions ============

    /// Parse an expression
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_logical()
    }

    /// `AND`, `OR`, `XOR`
    fn parse_logical(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not()?;
        loop {
            let op = match self.current().kind {
                TokenKind::And => BinaryOperator::And,
                TokenKind::Or => BinaryOperator::Or,
                TokenKind::Xor => BinaryOperator::Xor,
                _ => break,
            };
            self.advance();
            let right = self.parse_not()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.consume(TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::unary(UnaryOperator::Not, operand));
        }
        self.parse_comparison()
    }

    /// `= < > <= >= <>`, the two-character forms assembled from two tokens
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        while let Some(op) = self.comparison_operator() {
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// Consume a comparison operator if one starts here
    fn comparison_operator(&mut self) -> Option<BinaryOperator> {
        let next = self.peek_nth(1).kind;
        let (op, width) = match (self.current().kind, next) {
            (TokenKind::Lt, TokenKind::Eq) => (BinaryOperator::Le, 2),
            (TokenKind::Lt, TokenKind::Gt) => (BinaryOperator::Ne, 2),
            (TokenKind::Gt, TokenKind::Eq) => (BinaryOperator::Ge, 2),
            (TokenKind::Lt, _) => (BinaryOperator::Lt, 1),
            (TokenKind::Gt, _) => (BinaryOperator::Gt, 1),
            (TokenKind::Eq, _) => (BinaryOperator::Eq, 1),
            _ => return None,
        };
        for _ in 0..width {
            self.advance();
        }
        Some(op)
    }

    /// `+ -`
    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// `SHL SHR SAR`
    fn parse_shift(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Shl => BinaryOperator::Shl,
                TokenKind::Shr => BinaryOperator::Shr,
                TokenKind::Sar => BinaryOperator::Sar,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// `* / MOD`
    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                TokenKind::Mod => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// `^`, left-associative with a unary right operand
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.consume(TokenKind::Caret) {
            let right = self.parse_unary()?;
            left = Expr::binary(BinaryOperator::Pow, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Before => UnaryOperator::Before,
            TokenKind::After => UnaryOperator::After,
            TokenKind::Int => UnaryOperator::Int,
            TokenKind::Float => UnaryOperator::Float,
            TokenKind::Str => UnaryOperator::Str,
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Minus => UnaryOperator::Neg,
            TokenKind::Tilde => UnaryOperator::Complement,
            TokenKind::New | TokenKind::First | TokenKind::Last => {
                let op = match self.advance().kind {
                    TokenKind::New => UnaryOperator::New,
                    TokenKind::First => UnaryOperator::First,
                    _ => UnaryOperator::Last,
                };
                let ident = self.parse_ident()?;
                return Ok(Expr::unary(op, Expr::Identifier(ident)));
            }
            TokenKind::Return => {
                self.advance();
                let value = self.parse_expr()?;
                return Ok(Expr::unary(UnaryOperator::Return, value));
            }
            _ => return self.parse_atom(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::unary(op, operand))
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::IntLiteral => {
                let value = lexer::int_value(&token.text).ok_or_else(|| self.unexpected())?;
                self.advance();
                Ok(Expr::IntLiteral(value))
            }
            TokenKind::FloatLiteral => {
                let value = lexer::float_value(&token.text).ok_or_else(|| self.unexpected())?;
                self.advance();
                Ok(Expr::FloatLiteral(Float(value)))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::StringLiteral(lexer::string_value(&token.text).to_string()))
            }
            TokenKind::Identifier => {
                self.advance();
                let name = Identifier::new(token.text);
                if !self.consume(TokenKind::LParen) {
                    return Ok(Expr::Identifier(name));
                }
                let args = if self.check(TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                self.expect(TokenKind::RParen)?;
                Ok(Expr::FunctionCall { callee: name, args })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }
}

fn unexpected_token(token: &Token) -> ParseError {
    if token.is_eof() {
        return ParseError::UnexpectedEof;
    }
    let text = match token.kind {
        TokenKind::StringLiteral => lexer::string_value(&token.text),
        _ => &token.text,
    };
    ParseError::UnexpectedToken {
        kind: token.kind,
        text: text.to_string(),
        position: token.position(),
    }
}

/// Parse source code into an AST.
///
/// Lexical errors win over syntax errors: if the source does not lex, every
/// lexical error is returned and the parser never runs.
pub fn parse(source: &str) -> ParseResult<Program> {
    let tokens = lexer::tokenize(source)?;
    let program = Parser::new(tokens).parse_program()?;
    debug!(statements = program.statements.len(), "parsed program");
    Ok(program)
}

//! Token definitions for the Blitz3D dialect
//!
//! `TokenKind` doubles as the `logos` automaton for literals, identifiers and
//! symbols. Keywords have no pattern of their own: the lexer matches them as
//! identifiers and re-types them through [`TokenKind::keyword`], which is how
//! case-insensitive keywords keep their original spelling in `Token::text`.

use crate::span::{Position, Span};
use logos::Logos;
use std::fmt;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text exactly as written (keywords keep their casing)
    pub text: String,
    pub line: u32,
    pub column: u32,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            line: position.line,
            column: position.column,
            span,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// All token kinds of the language
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\f\v]+")]
#[logos(skip r";[^\n]*")]
pub enum TokenKind {
    // ============ Literals ============

    /// Integer literal: 42, 007
    #[regex(r"[0-9]+")]
    IntLiteral,

    /// Float literal: 3.14, 2., .5
    #[regex(r"[0-9]+\.[0-9]*")]
    #[regex(r"\.[0-9]+")]
    FloatLiteral,

    /// String literal: "hello" (no escapes, single line)
    #[regex(r#""[^"\n]*""#)]
    StringLiteral,

    /// Identifier: Unicode letters, digits and `_`, not starting with a digit
    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Identifier,

    // ============ Keywords ============
    After,
    And,
    Before,
    Case,
    Const,
    Data,
    Default,
    Delete,
    Dim,
    Each,
    Else,
    ElseIf,
    End,
    EndIf,
    Exit,
    False,
    Field,
    First,
    Float,
    For,
    Forever,
    Function,
    Global,
    Gosub,
    Goto,
    If,
    Insert,
    Int,
    Last,
    Local,
    Mod,
    New,
    Next,
    Not,
    Null,
    Or,
    Pi,
    Read,
    Repeat,
    Restore,
    Return,
    Sar,
    Select,
    Shl,
    Shr,
    Step,
    Str,
    Then,
    To,
    True,
    Type,
    Until,
    Wend,
    While,
    Xor,
    Include,

    // ============ Symbols ============
    #[token("#")]
    Hash,
    #[token("$")]
    Dollar,
    #[token("%")]
    Percent,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("\\")]
    Backslash,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("~")]
    Tilde,
    #[token("^")]
    Caret,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    /// Statement separator
    #[token("\n")]
    Newline,

    // ============ Special ============

    /// End of input
    Eof,
}

/// Keyword table, in the spelling used by diagnostics.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("AFTER", TokenKind::After),
    ("AND", TokenKind::And),
    ("BEFORE", TokenKind::Before),
    ("CASE", TokenKind::Case),
    ("CONST", TokenKind::Const),
    ("DATA", TokenKind::Data),
    ("DEFAULT", TokenKind::Default),
    ("DELETE", TokenKind::Delete),
    ("DIM", TokenKind::Dim),
    ("EACH", TokenKind::Each),
    ("ELSE", TokenKind::Else),
    ("ELSEIF", TokenKind::ElseIf),
    ("END", TokenKind::End),
    ("ENDIF", TokenKind::EndIf),
    ("EXIT", TokenKind::Exit),
    ("FALSE", TokenKind::False),
    ("FIELD", TokenKind::Field),
    ("FIRST", TokenKind::First),
    ("FLOAT", TokenKind::Float),
    ("FOR", TokenKind::For),
    ("FOREVER", TokenKind::Forever),
    ("FUNCTION", TokenKind::Function),
    ("GLOBAL", TokenKind::Global),
    ("GOSUB", TokenKind::Gosub),
    ("GOTO", TokenKind::Goto),
    ("IF", TokenKind::If),
    ("INSERT", TokenKind::Insert),
    ("INT", TokenKind::Int),
    ("LAST", TokenKind::Last),
    ("LOCAL", TokenKind::Local),
    ("MOD", TokenKind::Mod),
    ("NEW", TokenKind::New),
    ("NEXT", TokenKind::Next),
    ("NOT", TokenKind::Not),
    ("NULL", TokenKind::Null),
    ("OR", TokenKind::Or),
    ("PI", TokenKind::Pi),
    ("READ", TokenKind::Read),
    ("REPEAT", TokenKind::Repeat),
    ("RESTORE", TokenKind::Restore),
    ("RETURN", TokenKind::Return),
    ("SAR", TokenKind::Sar),
    ("SELECT", TokenKind::Select),
    ("SHL", TokenKind::Shl),
    ("SHR", TokenKind::Shr),
    ("STEP", TokenKind::Step),
    ("STR", TokenKind::Str),
    ("THEN", TokenKind::Then),
    ("TO", TokenKind::To),
    ("TRUE", TokenKind::True),
    ("TYPE", TokenKind::Type),
    ("UNTIL", TokenKind::Until),
    ("WEND", TokenKind::Wend),
    ("WHILE", TokenKind::While),
    ("XOR", TokenKind::Xor),
    ("INCLUDE", TokenKind::Include),
];

impl TokenKind {
    /// Look up a keyword, ignoring ASCII case.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(word))
            .map(|&(_, kind)| kind)
    }

    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        KEYWORDS.iter().any(|&(_, kind)| kind == *self)
    }

    /// Tokens that end a statement without being part of it.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Else
                | TokenKind::ElseIf
                | TokenKind::EndIf
                | TokenKind::End
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = KEYWORDS.iter().find(|&&(_, kind)| kind == *self) {
            return f.write_str(name);
        }
        let s = match self {
            TokenKind::IntLiteral => "INTLIT",
            TokenKind::FloatLiteral => "FLOATLIT",
            TokenKind::StringLiteral => "STRLIT",
            TokenKind::Identifier => "ID",
            TokenKind::Hash => "#",
            TokenKind::Dollar => "$",
            TokenKind::Percent => "%",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Backslash => "\\",
            TokenKind::Eq => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Tilde => "~",
            TokenKind::Caret => "^",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Eof => "EOF",
            // keywords were handled by the table above
            _ => "KEYWORD",
        };
        f.write_str(s)
    }
}

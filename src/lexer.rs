//! Lexer for the Blitz3D dialect
//!
//! The lexer converts source code into a stream of tokens.
//! It uses the `logos` crate for the lexeme automaton and adds what logos
//! does not do for us: keyword re-typing, line/column tracking and
//! per-character error recovery.

use crate::span::{find_column, Position, Span};
use crate::token::{Token, TokenKind};
use logos::Logos;
use thiserror::Error;
use tracing::debug;

/// Lexer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    #[error("Illegal character '{ch}' at {position}")]
    IllegalCharacter { ch: char, position: Position },

    #[error("Integer literal '{text}' out of range at {position}")]
    IntegerOutOfRange { text: String, position: Position },
}

impl LexerError {
    pub fn position(&self) -> Position {
        match self {
            LexerError::IllegalCharacter { position, .. } => *position,
            LexerError::IntegerOutOfRange { position, .. } => *position,
        }
    }
}

/// Every lexical error of a source, reported as one failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", join_messages(.0))]
pub struct LexErrors(pub Vec<LexerError>);

impl LexErrors {
    pub fn errors(&self) -> &[LexerError] {
        &self.0
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

fn join_messages(errors: &[LexerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The lexer for the Blitz3D dialect
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, TokenKind>,
    /// Byte offset of `inner`'s input within `source`
    base: usize,
    line: u32,
    errors: Vec<LexerError>,
    done: bool,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(source),
            base: 0,
            line: 1,
            errors: Vec::new(),
            done: false,
        }
    }

    /// Get the source code
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Get any errors that occurred during lexing
    pub fn errors(&self) -> &[LexerError] {
        &self.errors
    }

    fn position_at(&self, offset: usize) -> Position {
        Position::new(self.line, find_column(self.source, offset))
    }

    /// Get the next token; returns `Eof` forever once the input is exhausted
    pub fn next_token(&mut self) -> Token {
        loop {
            match self.inner.next() {
                Some(Ok(kind)) => {
                    let range = self.inner.span();
                    let span = Span::new(self.base + range.start, self.base + range.end);
                    return self.make_token(kind, span);
                }
                Some(Err(())) => {
                    // Record the first offending character and restart one
                    // character later, so a partial match (an unterminated
                    // string, say) does not swallow the text after it.
                    let start = self.base + self.inner.span().start;
                    let Some(ch) = self.source[start..].chars().next() else {
                        continue;
                    };
                    self.errors.push(LexerError::IllegalCharacter {
                        ch,
                        position: self.position_at(start),
                    });
                    self.base = start + ch.len_utf8();
                    self.inner = TokenKind::lexer(&self.source[self.base..]);
                }
                None => {
                    self.done = true;
                    let end = self.source.len();
                    let position = self.position_at(end);
                    return Token::new(TokenKind::Eof, "", position, Span::new(end, end));
                }
            }
        }
    }

    fn make_token(&mut self, kind: TokenKind, span: Span) -> Token {
        let text = span.text(self.source);
        let position = self.position_at(span.start);
        let kind = match kind {
            TokenKind::Identifier => TokenKind::keyword(text).unwrap_or(kind),
            TokenKind::IntLiteral => {
                if text.parse::<i32>().is_err() {
                    self.errors.push(LexerError::IntegerOutOfRange {
                        text: text.to_string(),
                        position,
                    });
                }
                kind
            }
            TokenKind::Newline => {
                self.line += 1;
                kind
            }
            _ => kind,
        };
        Token::new(kind, text, position, span)
    }

    /// Collect all tokens (ending with `Eof`) together with the errors
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let eof = token.is_eof();
            tokens.push(token);
            if eof {
                break;
            }
        }

        (tokens, self.errors)
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

/// Lenient lexing: all tokens plus every lexical error found on the way.
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexerError>) {
    Lexer::new(source).tokenize()
}

/// Strict lexing: the tokens, or every lexical error at once.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexErrors> {
    let (tokens, errors) = lex(source);
    debug!(tokens = tokens.len(), errors = errors.len(), "lexed source");
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(LexErrors(errors))
    }
}

/// Parse the text of an `IntLiteral` token.
pub fn int_value(text: &str) -> Option<i32> {
    text.parse().ok()
}

/// Parse the text of a `FloatLiteral` token (`2.` and `.5` included).
pub fn float_value(text: &str) -> Option<f32> {
    text.parse().ok()
}

/// The contents of a `StringLiteral` token, without the quotes.
pub fn string_value(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text)
}

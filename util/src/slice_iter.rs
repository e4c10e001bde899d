use ast::{DebugToken, Ident, Pos, Token};
use std::fmt::{self, Debug, Formatter};
use thiserror::Error;

pub struct SliceIter<'a> {
    bytes: &'a [u8],
    pos: Pos,
}

impl Iterator for SliceIter<'_> {
    type Item = u8;
    fn next(&mut self) -> Option<u8> {
        let (&first, rest) = self.bytes.split_first()?;
        self.bytes = rest;
        if first == b'\n' {
            self.pos.line += 1;
            self.pos.col = 0;
        } else {
            self.pos.col += 1;
        }
        Some(first)
    }
}

impl<'a> SliceIter<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: Pos::new(1, 0),
        }
    }

    pub const fn pos(&self) -> Pos {
        self.pos
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    pub const fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn next_if(&mut self, f: impl Fn(u8) -> bool) -> Option<u8> {
        let next = self.peek()?;
        if f(next) {
            self.next()
        } else {
            None
        }
    }

    pub fn next_if_map<Y>(&mut self, f: impl Fn(u8) -> Option<Y>) -> Option<Y> {
        let res = f(self.peek()?);
        if res.is_some() {
            self.next();
        }
        res
    }

    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            self.next();
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Expected {
    #[error("unexpected end of input")]
    Eof(Pos),
    #[error("expected \"{expected}\", got \"{got}\"")]
    Token {
        expected: Token,
        got: Token,
        pos: Pos,
    },
    #[error("expected an identifier, got \"{got}\"")]
    Identifier { got: Token, pos: Pos },
    #[error("expected a type, got \"{got}\"")]
    Type { got: Token, pos: Pos },
    #[error("expected an expression, got \"{got}\"")]
    Expression { got: Token, pos: Pos },
    #[error("expected a statement, got \"{got}\"")]
    Statement { got: Token, pos: Pos },
}

impl Expected {
    pub const fn pos(&self) -> Pos {
        match self {
            Self::Eof(pos)
            | Self::Token { pos, .. }
            | Self::Identifier { pos, .. }
            | Self::Type { pos, .. }
            | Self::Expression { pos, .. }
            | Self::Statement { pos, .. } => *pos,
        }
    }
}

#[derive(Clone)]
pub struct TokenIter {
    tokens: std::vec::IntoIter<DebugToken>,
    last: Pos,
}

impl Debug for TokenIter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.peek() {
            Some(t) => write!(f, "TokenIter{{{t:?}}}"),
            None => write!(f, "TokenIter{{_}}"),
        }
    }
}

impl TokenIter {
    pub fn new(tokens: Box<[DebugToken]>) -> Self {
        let last = tokens.last().map(|t| t.pos).unwrap_or_default();
        let tokens: Vec<DebugToken> = tokens.into();
        Self {
            tokens: tokens.into_iter(),
            last,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.peek().is_none()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.as_slice().get(n).map(|t| &t.token)
    }

    /// Position of the next token, or of the last one once input runs out.
    pub fn pos(&self) -> Pos {
        self.tokens.as_slice().first().map_or(self.last, |t| t.pos)
    }

    pub fn peek_any(&self) -> Result<&Token, Expected> {
        self.peek().ok_or(Expected::Eof(self.last))
    }

    pub fn consume_any(&mut self) -> Result<Token, Expected> {
        self.next().ok_or(Expected::Eof(self.last))
    }

    pub fn next_if_eq(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.next();
            true
        } else {
            false
        }
    }

    pub fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        let res = f(self.peek()?);
        if res.is_some() {
            self.next();
        }
        res
    }

    pub fn consume(&mut self, expected: Token) -> Result<Pos, Expected> {
        let pos = self.pos();
        let got = self.consume_any()?;
        if got == expected {
            Ok(pos)
        } else {
            Err(Expected::Token { expected, got, pos })
        }
    }

    pub fn consume_identifier(&mut self) -> Result<Ident, Expected> {
        let pos = self.pos();
        match self.consume_any()? {
            Token::Ident(ident) => Ok(ident),
            got => Err(Expected::Identifier { got, pos }),
        }
    }

    pub fn unexpected(&self, f: impl FnOnce(Token, Pos) -> Expected) -> Expected {
        match self.peek() {
            Some(got) => f(got.clone(), self.pos()),
            None => Expected::Eof(self.last),
        }
    }
}

impl Iterator for TokenIter {
    type Item = Token;
    fn next(&mut self) -> Option<Token> {
        self.tokens.next().map(|t| t.token)
    }
}

use crate::{Ident, Pos};
use std::fmt::{self, Display, Formatter};

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Token {
    // Keywords
    Begin,
    End,
    Is,
    Skip,
    Read,
    Free,
    Return,
    Exit,
    Print,
    Println,
    If,
    Then,
    Else,
    Fi,
    While,
    Do,
    Done,
    NewPair,
    Call,
    Fst,
    Snd,
    Int,
    Bool,
    Char,
    String,
    Pair,
    Len,
    Ord,
    Chr,
    True,
    False,
    Null,

    IntLit(i64),
    CharLit(u8),
    StrLit(Ident),
    Ident(Ident),

    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,
    Semicolon,
    Equals,

    Not,
    Minus,
    Plus,
    Asterisk,
    Slash,
    Percent,
    GreaterThan,
    Geq,
    LessThan,
    Leq,
    EqualTo,
    NotEqual,
    LogicalAnd,
    LogicalOr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugToken {
    pub token: Token,
    pub pos: Pos,
}

impl Token {
    pub fn keyword(word: &str) -> Option<Self> {
        Some(match word {
            "begin" => Self::Begin,
            "end" => Self::End,
            "is" => Self::Is,
            "skip" => Self::Skip,
            "read" => Self::Read,
            "free" => Self::Free,
            "return" => Self::Return,
            "exit" => Self::Exit,
            "print" => Self::Print,
            "println" => Self::Println,
            "if" => Self::If,
            "then" => Self::Then,
            "else" => Self::Else,
            "fi" => Self::Fi,
            "while" => Self::While,
            "do" => Self::Do,
            "done" => Self::Done,
            "newpair" => Self::NewPair,
            "call" => Self::Call,
            "fst" => Self::Fst,
            "snd" => Self::Snd,
            "int" => Self::Int,
            "bool" => Self::Bool,
            "char" => Self::Char,
            "string" => Self::String,
            "pair" => Self::Pair,
            "len" => Self::Len,
            "ord" => Self::Ord,
            "chr" => Self::Chr,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            _ => return None,
        })
    }

    pub const fn base_type(&self) -> bool {
        matches!(self, Self::Int | Self::Bool | Self::Char | Self::String)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Token::*;
        f.write_str(match self {
            Begin => "begin",
            End => "end",
            Is => "is",
            Skip => "skip",
            Read => "read",
            Free => "free",
            Return => "return",
            Exit => "exit",
            Print => "print",
            Println => "println",
            If => "if",
            Then => "then",
            Else => "else",
            Fi => "fi",
            While => "while",
            Do => "do",
            Done => "done",
            NewPair => "newpair",
            Call => "call",
            Fst => "fst",
            Snd => "snd",
            Int => "int",
            Bool => "bool",
            Char => "char",
            String => "string",
            Pair => "pair",
            Len => "len",
            Ord => "ord",
            Chr => "chr",
            True => "true",
            False => "false",
            Null => "null",
            IntLit(i) => return write!(f, "{i}"),
            CharLit(c) => return write!(f, "'{}'", crate::escape(*c)),
            StrLit(s) => return write!(f, "\"{}\"", crate::escape_str(s)),
            Ident(name) => return f.write_str(name),
            OpenParen => "(",
            CloseParen => ")",
            OpenBracket => "[",
            CloseBracket => "]",
            Comma => ",",
            Semicolon => ";",
            Equals => "=",
            Not => "!",
            Minus => "-",
            Plus => "+",
            Asterisk => "*",
            Slash => "/",
            Percent => "%",
            GreaterThan => ">",
            Geq => ">=",
            LessThan => "<",
            Leq => "<=",
            EqualTo => "==",
            NotEqual => "!=",
            LogicalAnd => "&&",
            LogicalOr => "||",
        })
    }
}

pub mod expr;
pub mod parse;
pub mod token;
pub mod typed;
pub mod types;

pub use expr::{Bop, Expr, ExprKind, PairSide, UnOp};
pub use token::{DebugToken, Token};
pub use types::Type;

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

pub type Ident = Rc<str>;
pub type Arr<T> = Box<[T]>;

/// Source position: 1-based line, 0-based column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl Display for Pos {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Escapes a byte the way it must appear between quotes in source or in an
/// `.ascii` directive.
pub fn escape(byte: u8) -> Cow<'static, str> {
    Cow::Borrowed(match byte {
        b'\0' => "\\0",
        b'\x08' => "\\b",
        b'\t' => "\\t",
        b'\n' => "\\n",
        b'\x0c' => "\\f",
        b'\r' => "\\r",
        b'"' => "\\\"",
        b'\'' => "\\'",
        b'\\' => "\\\\",
        b' ' => " ",
        other if other.is_ascii_graphic() => return Cow::Owned(char::from(other).to_string()),
        other => return Cow::Owned(format!("\\{other:03o}")),
    })
}

pub fn escape_str(s: &str) -> String {
    s.bytes().map(escape).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn escapes() {
        assert_eq!(escape(b'a'), "a");
        assert_eq!(escape(b'\n'), "\\n");
        assert_eq!(escape_str("say \"hi\"\0"), "say \\\"hi\\\"\\0");
        assert_eq!(escape(0x07), "\\007");
        assert_eq!(escape(0xE9), "\\351");
    }
}

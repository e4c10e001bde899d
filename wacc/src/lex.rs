use ast::{DebugToken, Pos, Token};
use util::SliceIter;

pub fn tokenize(source: &[u8]) -> Result<Box<[DebugToken]>, Error> {
    let mut iter = SliceIter::new(source);

    let mut tokens = Vec::new();
    loop {
        skip_trivia(&mut iter);
        let pos = iter.pos();
        match lex_slice(&mut iter)? {
            Some(token) => tokens.push(DebugToken { token, pos }),
            None => break,
        }
    }
    log::trace!("lexed {} tokens", tokens.len());
    Ok(tokens.into())
}

fn skip_trivia(iter: &mut SliceIter) {
    loop {
        match iter.peek() {
            Some(b) if b.is_ascii_whitespace() => {
                iter.next();
            }
            Some(b'#') => {
                while iter.next_if(|b| b != b'\n').is_some() {}
            }
            _ => return,
        }
    }
}

fn lex_slice(iter: &mut SliceIter) -> Result<Option<Token>, Error> {
    let pos = iter.pos();
    let double = match iter.as_slice() {
        [b'&', b'&', ..] => Some(Token::LogicalAnd),
        [b'|', b'|', ..] => Some(Token::LogicalOr),
        [b'!', b'=', ..] => Some(Token::NotEqual),
        [b'=', b'=', ..] => Some(Token::EqualTo),
        [b'>', b'=', ..] => Some(Token::Geq),
        [b'<', b'=', ..] => Some(Token::Leq),
        _ => None,
    };
    if let Some(token) = double {
        iter.advance(2);
        return Ok(Some(token));
    }

    let Some(byte) = iter.next() else {
        return Ok(None);
    };
    Ok(Some(match byte {
        b'(' => Token::OpenParen,
        b')' => Token::CloseParen,
        b'[' => Token::OpenBracket,
        b']' => Token::CloseBracket,
        b',' => Token::Comma,
        b';' => Token::Semicolon,
        b'=' => Token::Equals,
        b'!' => Token::Not,
        b'-' => Token::Minus,
        b'+' => Token::Plus,
        b'*' => Token::Asterisk,
        b'/' => Token::Slash,
        b'%' => Token::Percent,
        b'>' => Token::GreaterThan,
        b'<' => Token::LessThan,
        b'0'..=b'9' => Token::IntLit(number(byte, iter)),
        b'\'' => Token::CharLit(char_literal(iter, pos)?),
        b'"' => Token::StrLit(string_literal(iter, pos)?),
        b if word_start(b) => word(b, iter),
        other => return Err(Error::InvalidCharacter { byte: other, pos }),
    }))
}

// saturates, the parser rejects anything outside 32 bits anyway
fn number(first: u8, iter: &mut SliceIter) -> i64 {
    let mut value = i64::from(first - b'0');
    while let Some(digit) = iter.next_if_map(|b| b.is_ascii_digit().then(|| b - b'0')) {
        value = value.saturating_mul(10).saturating_add(i64::from(digit));
    }
    value
}

fn char_literal(iter: &mut SliceIter, pos: Pos) -> Result<u8, Error> {
    let c = match iter.next() {
        Some(b'\\') => escape(iter, pos)?,
        Some(b'\'' | b'"') | None => return Err(Error::InvalidCharLiteral(pos)),
        Some(c) if !c.is_ascii() => return Err(Error::InvalidCharacter { byte: c, pos }),
        Some(c) => c,
    };
    match iter.next() {
        Some(b'\'') => Ok(c),
        _ => Err(Error::InvalidCharLiteral(pos)),
    }
}

fn string_literal(iter: &mut SliceIter, pos: Pos) -> Result<ast::Ident, Error> {
    let mut bytes = Vec::new();
    loop {
        match iter.next() {
            Some(b'"') => break,
            Some(b'\\') => bytes.push(escape(iter, pos)?),
            Some(b'\n') | None => return Err(Error::UnterminatedString(pos)),
            Some(b) if !b.is_ascii() => return Err(Error::InvalidCharacter { byte: b, pos }),
            Some(b) => bytes.push(b),
        }
    }
    Ok(bytes.into_iter().map(char::from).collect::<String>().into())
}

fn escape(iter: &mut SliceIter, pos: Pos) -> Result<u8, Error> {
    Ok(match iter.next() {
        Some(b'0') => b'\0',
        Some(b'b') => b'\x08',
        Some(b't') => b'\t',
        Some(b'n') => b'\n',
        Some(b'f') => b'\x0c',
        Some(b'r') => b'\r',
        Some(c @ (b'"' | b'\'' | b'\\')) => c,
        Some(other) => return Err(Error::InvalidEscape { byte: other, pos }),
        None => return Err(Error::UnterminatedString(pos)),
    })
}

fn word(first: u8, iter: &mut SliceIter) -> Token {
    let mut word = String::from(char::from(first));
    while let Some(b) = iter.next_if(word_character) {
        word.push(char::from(b));
    }
    Token::keyword(&word).unwrap_or_else(|| Token::Ident(word.into()))
}

const fn word_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

const fn word_character(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("invalid character {}", printable(.byte))]
    InvalidCharacter { byte: u8, pos: Pos },
    #[error("invalid character literal")]
    InvalidCharLiteral(Pos),
    #[error("unknown escape sequence \\{}", printable(.byte))]
    InvalidEscape { byte: u8, pos: Pos },
    #[error("unterminated string literal")]
    UnterminatedString(Pos),
}

fn printable(byte: &u8) -> String {
    char::from(*byte).escape_default().to_string()
}

impl Error {
    pub const fn pos(&self) -> Pos {
        match self {
            Self::InvalidCharacter { pos, .. }
            | Self::InvalidCharLiteral(pos)
            | Self::InvalidEscape { pos, .. }
            | Self::UnterminatedString(pos) => *pos,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source.as_bytes())
            .unwrap()
            .iter()
            .map(|t| t.token.clone())
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("begin int x_1 = 5 end"),
            [
                Token::Begin,
                Token::Int,
                Token::Ident("x_1".into()),
                Token::Equals,
                Token::IntLit(5),
                Token::End
            ]
        );
    }

    #[test]
    fn operators_take_longest_match() {
        assert_eq!(
            kinds("a<=b==c!d&&e"),
            [
                Token::Ident("a".into()),
                Token::Leq,
                Token::Ident("b".into()),
                Token::EqualTo,
                Token::Ident("c".into()),
                Token::Not,
                Token::Ident("d".into()),
                Token::LogicalAnd,
                Token::Ident("e".into()),
            ]
        );
    }

    #[test]
    fn literals_and_escapes() {
        assert_eq!(
            kinds(r#"'\n' "a\"b" 'x'"#),
            [
                Token::CharLit(b'\n'),
                Token::StrLit("a\"b".into()),
                Token::CharLit(b'x'),
            ]
        );
    }

    #[test]
    fn comments_and_positions() {
        let tokens = tokenize(b"# header\n  skip # trailing\nend").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].pos, Pos::new(2, 2));
        assert_eq!(tokens[1].pos, Pos::new(3, 0));
    }

    #[test]
    fn huge_numbers_saturate() {
        assert_eq!(kinds("99999999999999999999999"), [Token::IntLit(i64::MAX)]);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            tokenize(b"int x = $"),
            Err(Error::InvalidCharacter {
                byte: b'$',
                pos: Pos::new(1, 8)
            })
        );
        assert!(matches!(tokenize(b"\"abc"), Err(Error::UnterminatedString(_))));
        assert!(matches!(tokenize(b"'\\q'"), Err(Error::InvalidEscape { .. })));
        assert!(matches!(tokenize(b"''"), Err(Error::InvalidCharLiteral(_))));
    }

    #[test]
    fn literals_are_ascii_only() {
        assert_eq!(
            tokenize("x = \"caf\u{e9}\"".as_bytes()),
            Err(Error::InvalidCharacter {
                byte: 0xC3,
                pos: Pos::new(1, 4)
            })
        );
        assert!(matches!(
            tokenize("'\u{e9}'".as_bytes()),
            Err(Error::InvalidCharacter { byte: 0xC3, .. })
        ));
        assert_eq!(kinds("\"a\\tb\""), [Token::StrLit("a\tb".into())]);
    }
}

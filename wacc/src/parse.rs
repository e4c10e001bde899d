pub use ast::parse::{BaseType, Func, Param, Program, Stmnt, StmntKind, TypeNode};
use ast::{Arr, Bop, DebugToken, Expr, ExprKind, Ident, PairSide, Pos, Token, UnOp};
use util::{Expected, TokenIter};

pub fn parse(tokens: Box<[DebugToken]>) -> Result<Program, Error> {
    let mut tokens = TokenIter::new(tokens);
    let program = program(&mut tokens)?;
    match tokens.peek() {
        None => Ok(program),
        Some(got) => Err(Error::ExtraStuff {
            got: got.clone(),
            pos: tokens.pos(),
        }),
    }
}

fn program(tokens: &mut TokenIter) -> Result<Program, Error> {
    tokens.consume(Token::Begin)?;
    let mut funcs = Vec::new();
    while is_function(tokens) {
        funcs.push(function(tokens)?);
    }
    let body = statements(tokens)?;
    tokens.consume(Token::End)?;
    Ok(Program {
        funcs: funcs.into(),
        body,
    })
}

// a function starts with `type ident (`, a declaration with `type ident =`
fn is_function(tokens: &TokenIter) -> bool {
    let mut probe = tokens.clone();
    type_node(&mut probe).is_ok()
        && probe.consume_identifier().is_ok()
        && probe.peek() == Some(&Token::OpenParen)
}

fn function(tokens: &mut TokenIter) -> Result<Func, Error> {
    let pos = tokens.pos();
    let ret = type_node(tokens)?;
    let name = tokens.consume_identifier()?;
    tokens.consume(Token::OpenParen)?;
    let params = param_list(tokens)?;
    tokens.consume(Token::Is)?;
    let body = statements(tokens)?;
    tokens.consume(Token::End)?;
    Ok(Func {
        name,
        ret,
        params,
        body,
        pos,
    })
}

fn param_list(tokens: &mut TokenIter) -> Result<Arr<Param>, Error> {
    let mut params = Vec::new();
    if tokens.next_if_eq(&Token::CloseParen) {
        return Ok(params.into());
    }
    loop {
        let pos = tokens.pos();
        let typ = type_node(tokens)?;
        let name = tokens.consume_identifier()?;
        params.push(Param { typ, name, pos });

        let pos = tokens.pos();
        match tokens.consume_any()? {
            Token::Comma => {}
            Token::CloseParen => break,
            got => {
                return Err(Expected::Token {
                    expected: Token::CloseParen,
                    got,
                    pos,
                }
                .into())
            }
        }
    }
    Ok(params.into())
}

fn type_node(tokens: &mut TokenIter) -> Result<TypeNode, Error> {
    let pos = tokens.pos();
    let base = match tokens.consume_any()? {
        Token::Int => TypeNode::Base(BaseType::Int),
        Token::Bool => TypeNode::Base(BaseType::Bool),
        Token::Char => TypeNode::Base(BaseType::Char),
        Token::String => TypeNode::Base(BaseType::String),
        Token::Pair => {
            tokens.consume(Token::OpenParen)?;
            let fst = pair_elem_type(tokens)?;
            tokens.consume(Token::Comma)?;
            let snd = pair_elem_type(tokens)?;
            tokens.consume(Token::CloseParen)?;
            TypeNode::Pair(fst, snd)
        }
        got => return Err(Expected::Type { got, pos }.into()),
    };
    Ok(array_suffix(tokens, base))
}

fn array_suffix(tokens: &mut TokenIter, elem: TypeNode) -> TypeNode {
    let mut dims = 0;
    while tokens.peek() == Some(&Token::OpenBracket)
        && tokens.peek_nth(1) == Some(&Token::CloseBracket)
    {
        let _ = tokens.nth(1);
        dims += 1;
    }
    if dims == 0 {
        elem
    } else {
        TypeNode::Array {
            elem: Box::new(elem),
            dims,
        }
    }
}

fn pair_elem_type(tokens: &mut TokenIter) -> Result<Option<Box<TypeNode>>, Error> {
    if !tokens.next_if_eq(&Token::Pair) {
        return type_node(tokens).map(|t| Some(Box::new(t)));
    }
    if tokens.peek() == Some(&Token::OpenParen) {
        return Err(tokens
            .unexpected(|got, pos| Expected::Token {
                expected: Token::Comma,
                got,
                pos,
            })
            .into());
    }
    Ok(match array_suffix(tokens, TypeNode::Pair(None, None)) {
        TypeNode::Pair(None, None) => None,
        array => Some(Box::new(array)),
    })
}

fn statements(tokens: &mut TokenIter) -> Result<Stmnt, Error> {
    let first = statement(tokens)?;
    if tokens.peek() != Some(&Token::Semicolon) {
        return Ok(first);
    }
    let pos = first.pos;
    let mut seq = vec![first];
    while tokens.next_if_eq(&Token::Semicolon) {
        seq.push(statement(tokens)?);
    }
    Ok(Stmnt::new(StmntKind::Seq(seq.into()), pos))
}

fn statement(tokens: &mut TokenIter) -> Result<Stmnt, Error> {
    let pos = tokens.pos();
    let kind = match tokens.peek_any()?.clone() {
        Token::Skip => {
            tokens.next();
            StmntKind::Skip
        }
        Token::Read => {
            tokens.next();
            StmntKind::Read(lvalue(tokens)?)
        }
        Token::Free => {
            tokens.next();
            StmntKind::Free(expression(tokens, 0)?)
        }
        Token::Return => {
            tokens.next();
            StmntKind::Return(expression(tokens, 0)?)
        }
        Token::Exit => {
            tokens.next();
            StmntKind::Exit(expression(tokens, 0)?)
        }
        t @ (Token::Print | Token::Println) => {
            tokens.next();
            StmntKind::Print {
                exp: expression(tokens, 0)?,
                newline: t == Token::Println,
            }
        }
        Token::If => {
            tokens.next();
            let condition = expression(tokens, 0)?;
            tokens.consume(Token::Then)?;
            let then = Box::new(statements(tokens)?);
            tokens.consume(Token::Else)?;
            let r#else = Box::new(statements(tokens)?);
            tokens.consume(Token::Fi)?;
            StmntKind::If {
                condition,
                then,
                r#else,
            }
        }
        Token::While => {
            tokens.next();
            let condition = expression(tokens, 0)?;
            tokens.consume(Token::Do)?;
            let body = Box::new(statements(tokens)?);
            tokens.consume(Token::Done)?;
            StmntKind::While { condition, body }
        }
        Token::Begin => {
            tokens.next();
            let body = statements(tokens)?;
            tokens.consume(Token::End)?;
            StmntKind::Scope(Box::new(body))
        }
        t if t.base_type() || t == Token::Pair => {
            let typ = type_node(tokens)?;
            let name = tokens.consume_identifier()?;
            tokens.consume(Token::Equals)?;
            let init = rvalue(tokens)?;
            StmntKind::Decl { typ, name, init }
        }
        Token::Ident(_) | Token::Fst | Token::Snd => {
            let dst = lvalue(tokens)?;
            tokens.consume(Token::Equals)?;
            let src = rvalue(tokens)?;
            StmntKind::Assign { dst, src }
        }
        got => return Err(Expected::Statement { got, pos }.into()),
    };
    Ok(Stmnt::new(kind, pos))
}

fn lvalue(tokens: &mut TokenIter) -> Result<Expr, Error> {
    let pos = tokens.pos();
    match tokens.consume_any()? {
        Token::Ident(name) => identifier(tokens, name, pos),
        t @ (Token::Fst | Token::Snd) => pair_elem(tokens, t == Token::Fst, pos),
        got => Err(Expected::Identifier { got, pos }.into()),
    }
}

fn pair_elem(tokens: &mut TokenIter, fst: bool, pos: Pos) -> Result<Expr, Error> {
    let side = if fst { PairSide::Fst } else { PairSide::Snd };
    let pair = Box::new(lvalue(tokens)?);
    Ok(Expr::new(ExprKind::PairElem { side, pair }, pos))
}

// a variable, or an array element when indices follow
fn identifier(tokens: &mut TokenIter, name: Ident, pos: Pos) -> Result<Expr, Error> {
    let mut indices = Vec::new();
    while tokens.next_if_eq(&Token::OpenBracket) {
        indices.push(expression(tokens, 0)?);
        tokens.consume(Token::CloseBracket)?;
    }
    let kind = if indices.is_empty() {
        ExprKind::Var(name)
    } else {
        ExprKind::ArrayElem {
            name,
            indices: indices.into(),
        }
    };
    Ok(Expr::new(kind, pos))
}

fn rvalue(tokens: &mut TokenIter) -> Result<Expr, Error> {
    let pos = tokens.pos();
    let kind = match tokens.peek_any()?.clone() {
        Token::OpenBracket => {
            tokens.next();
            ExprKind::ArrayLit(comma_list(tokens, Token::CloseBracket)?)
        }
        Token::NewPair => {
            tokens.next();
            tokens.consume(Token::OpenParen)?;
            let fst = Box::new(expression(tokens, 0)?);
            tokens.consume(Token::Comma)?;
            let snd = Box::new(expression(tokens, 0)?);
            tokens.consume(Token::CloseParen)?;
            ExprKind::NewPair { fst, snd }
        }
        t @ (Token::Fst | Token::Snd) => {
            tokens.next();
            return pair_elem(tokens, t == Token::Fst, pos);
        }
        Token::Call => {
            tokens.next();
            let name = tokens.consume_identifier()?;
            tokens.consume(Token::OpenParen)?;
            let args = comma_list(tokens, Token::CloseParen)?;
            ExprKind::Call { name, args }
        }
        _ => return expression(tokens, 0),
    };
    Ok(Expr::new(kind, pos))
}

fn comma_list(tokens: &mut TokenIter, close: Token) -> Result<Arr<Expr>, Error> {
    let mut list = Vec::new();
    if tokens.next_if_eq(&close) {
        return Ok(list.into());
    }
    loop {
        list.push(expression(tokens, 0)?);
        let pos = tokens.pos();
        match tokens.consume_any()? {
            Token::Comma => {}
            t if t == close => break,
            got => {
                return Err(Expected::Token {
                    expected: close,
                    got,
                    pos,
                }
                .into())
            }
        }
    }
    Ok(list.into())
}

fn expression(tokens: &mut TokenIter, min_precedence: u8) -> Result<Expr, Error> {
    let mut left = factor(tokens)?;

    while let Some(operator) = binary_operator(tokens, min_precedence) {
        // every operator is left associative
        let right = expression(tokens, operator.precedence() + 1)?;
        let pos = left.pos;
        left = Expr::new(
            ExprKind::Bin {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            pos,
        );
    }
    Ok(left)
}

fn binary_operator(tokens: &mut TokenIter, min_precedence: u8) -> Option<Bop> {
    let bop = match tokens.peek()? {
        Token::Asterisk => Bop::Multiply,
        Token::Slash => Bop::Divide,
        Token::Percent => Bop::Remainder,
        Token::Plus => Bop::Add,
        Token::Minus => Bop::Subtract,
        Token::GreaterThan => Bop::GreaterThan,
        Token::Geq => Bop::Geq,
        Token::LessThan => Bop::LessThan,
        Token::Leq => Bop::Leq,
        Token::EqualTo => Bop::EqualTo,
        Token::NotEqual => Bop::NotEqual,
        Token::LogicalAnd => Bop::LogAnd,
        Token::LogicalOr => Bop::LogOr,
        _ => return None,
    };
    if bop.precedence() >= min_precedence {
        tokens.next();
        Some(bop)
    } else {
        None
    }
}

fn factor(tokens: &mut TokenIter) -> Result<Expr, Error> {
    let pos = tokens.pos();
    let kind = match tokens.consume_any()? {
        Token::IntLit(value) => ExprKind::Int(int_literal(value, pos)?),
        // a sign directly before a literal belongs to the literal
        sign @ (Token::Minus | Token::Plus) => match tokens.next_if_map(int_token) {
            Some(value) if sign == Token::Minus => ExprKind::Int(int_literal(-value, pos)?),
            Some(value) => ExprKind::Int(int_literal(value, pos)?),
            None if sign == Token::Minus => unary(tokens, UnOp::Negate)?,
            None => return Err(Expected::Expression { got: sign, pos }.into()),
        },
        Token::True => ExprKind::Bool(true),
        Token::False => ExprKind::Bool(false),
        Token::CharLit(c) => ExprKind::Char(c),
        Token::StrLit(s) => ExprKind::Str(s),
        Token::Null => ExprKind::Null,
        Token::Ident(name) => return identifier(tokens, name, pos),
        Token::Not => unary(tokens, UnOp::Not)?,
        Token::Len => unary(tokens, UnOp::Len)?,
        Token::Ord => unary(tokens, UnOp::Ord)?,
        Token::Chr => unary(tokens, UnOp::Chr)?,
        Token::OpenParen => {
            let exp = expression(tokens, 0)?;
            tokens.consume(Token::CloseParen)?;
            return Ok(exp);
        }
        got => return Err(Expected::Expression { got, pos }.into()),
    };
    Ok(Expr::new(kind, pos))
}

fn unary(tokens: &mut TokenIter, op: UnOp) -> Result<ExprKind, Error> {
    let exp = Box::new(factor(tokens)?);
    Ok(ExprKind::Unary { op, exp })
}

fn int_token(token: &Token) -> Option<i64> {
    match token {
        Token::IntLit(value) => Some(*value),
        _ => None,
    }
}

fn int_literal(value: i64, pos: Pos) -> Result<i32, Error> {
    i32::try_from(value).map_err(|_| Error::IntRange { value, pos })
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Expected(#[from] Expected),
    #[error("integer literal {value} does not fit in 32 bits")]
    IntRange { value: i64, pos: Pos },
    #[error("unexpected \"{got}\" after the end of the program")]
    ExtraStuff { got: Token, pos: Pos },
}

impl Error {
    pub const fn pos(&self) -> Pos {
        match self {
            Self::Expected(e) => e.pos(),
            Self::IntRange { pos, .. } | Self::ExtraStuff { pos, .. } => *pos,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lex;

    fn parse_str(source: &str) -> Result<Program, Error> {
        parse(lex::tokenize(source.as_bytes()).unwrap())
    }

    fn body(source: &str) -> StmntKind {
        parse_str(source).unwrap().body.kind
    }

    #[test]
    fn precedence_and_associativity() {
        let StmntKind::Exit(exp) = body("begin exit 1 - 2 - 3 * 4 end") else {
            panic!("expected exit");
        };
        assert_eq!(exp.to_string(), "(1 - 2) - (3 * 4)");
    }

    #[test]
    fn negative_literals() {
        let StmntKind::Exit(exp) = body("begin exit -2147483648 end") else {
            panic!("expected exit");
        };
        assert_eq!(exp.kind, ExprKind::Int(i32::MIN));
        assert_eq!(
            parse_str("begin exit 2147483648 end").map(|_| ()),
            Err(Error::IntRange {
                value: 2147483648,
                pos: Pos::new(1, 11)
            })
        );
    }

    #[test]
    fn functions_and_declarations() {
        let program = parse_str(
            "begin
               int f(int x, pair(int, pair) p) is return x end
               pair(int, int)[] g() is return null end
               int y = call f(1, null);
               y = 2
             end",
        )
        .unwrap();
        assert_eq!(program.funcs.len(), 2);
        assert_eq!(program.funcs[0].params.len(), 2);
        assert_eq!(
            program.funcs[0].params[1].typ,
            TypeNode::Pair(Some(Box::new(TypeNode::Base(BaseType::Int))), None)
        );
        assert!(matches!(program.funcs[1].ret, TypeNode::Array { dims: 1, .. }));
        let StmntKind::Seq(seq) = program.body.kind else {
            panic!("expected sequence");
        };
        assert!(matches!(seq[0].kind, StmntKind::Decl { .. }));
        assert!(matches!(seq[1].kind, StmntKind::Assign { .. }));
    }

    #[test]
    fn right_hand_sides() {
        let StmntKind::Seq(seq) =
            body("begin int[] a = [1, 2]; pair(int, int) p = newpair(1, 2); int x = fst p end")
        else {
            panic!("expected sequence");
        };
        let inits: Vec<_> = seq
            .iter()
            .map(|s| match &s.kind {
                StmntKind::Decl { init, .. } => init.kind.clone(),
                _ => panic!("expected declaration"),
            })
            .collect();
        assert!(matches!(&inits[0], ExprKind::ArrayLit(elems) if elems.len() == 2));
        assert!(matches!(inits[1], ExprKind::NewPair { .. }));
        assert!(matches!(
            inits[2],
            ExprKind::PairElem {
                side: PairSide::Fst,
                ..
            }
        ));
    }

    #[test]
    fn nested_blocks() {
        let StmntKind::If { then, r#else, .. } =
            body("begin if true then begin skip end else while false do skip done fi end")
        else {
            panic!("expected if");
        };
        assert!(matches!(then.kind, StmntKind::Scope(_)));
        assert!(matches!(r#else.kind, StmntKind::While { .. }));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(
            parse_str("begin skip end end"),
            Err(Error::ExtraStuff {
                got: Token::End,
                ..
            })
        ));
        assert!(matches!(
            parse_str("begin int x = end"),
            Err(Error::Expected(Expected::Expression { .. }))
        ));
        assert!(matches!(
            parse_str("begin x + 1 end"),
            Err(Error::Expected(Expected::Token { .. }))
        ));
        assert!(parse_str("begin int x = 1 + call f() end").is_err());
    }
}

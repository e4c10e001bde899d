use crate::{escape, escape_str, Arr, Ident, Pos};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i32),
    Bool(bool),
    Char(u8),
    Str(Ident),
    Null,
    Var(Ident),
    ArrayElem {
        name: Ident,
        indices: Arr<Expr>,
    },
    PairElem {
        side: PairSide,
        pair: Box<Expr>,
    },
    Unary {
        op: UnOp,
        exp: Box<Expr>,
    },
    Bin {
        operator: Bop,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    // right hand sides only
    Call {
        name: Ident,
        args: Arr<Expr>,
    },
    NewPair {
        fst: Box<Expr>,
        snd: Box<Expr>,
    },
    ArrayLit(Arr<Expr>),
}

impl Expr {
    pub const fn new(kind: ExprKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    pub const fn lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Var(_) | ExprKind::ArrayElem { .. } | ExprKind::PairElem { .. }
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PairSide {
    Fst,
    Snd,
}

impl PairSide {
    pub const fn offset(&self) -> i32 {
        match self {
            Self::Fst => 0,
            Self::Snd => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnOp {
    Not,
    Negate,
    Len,
    Ord,
    Chr,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Bop {
    Multiply,
    Divide,
    Remainder,
    Add,
    Subtract,
    GreaterThan,
    Geq,
    LessThan,
    Leq,
    EqualTo,
    NotEqual,
    LogAnd,
    LogOr,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum BopKind {
    Arithmetic,
    Ordering,
    Equality,
    Logical,
}

impl Bop {
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Multiply | Self::Divide | Self::Remainder => 6,
            Self::Add | Self::Subtract => 5,
            Self::GreaterThan | Self::Geq | Self::LessThan | Self::Leq => 4,
            Self::EqualTo | Self::NotEqual => 3,
            Self::LogAnd => 2,
            Self::LogOr => 1,
        }
    }

    pub const fn kind(&self) -> BopKind {
        match self {
            Self::Multiply | Self::Divide | Self::Remainder | Self::Add | Self::Subtract => {
                BopKind::Arithmetic
            }
            Self::GreaterThan | Self::Geq | Self::LessThan | Self::Leq => BopKind::Ordering,
            Self::EqualTo | Self::NotEqual => BopKind::Equality,
            Self::LogAnd | Self::LogOr => BopKind::Logical,
        }
    }
}

impl Display for Bop {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::GreaterThan => ">",
            Self::Geq => ">=",
            Self::LessThan => "<",
            Self::Leq => "<=",
            Self::EqualTo => "==",
            Self::NotEqual => "!=",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
        })
    }
}

impl Display for UnOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Not => "!",
            Self::Negate => "-",
            Self::Len => "len ",
            Self::Ord => "ord ",
            Self::Chr => "chr ",
        })
    }
}

impl Display for PairSide {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Fst => "fst",
            Self::Snd => "snd",
        })
    }
}

fn comma_separated(f: &mut Formatter, exprs: &[Expr]) -> fmt::Result {
    for (i, e) in exprs.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}

// Renders the expression back into source form for diagnostics.
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.kind {
            ExprKind::Int(i) => write!(f, "{i}"),
            ExprKind::Bool(b) => write!(f, "{b}"),
            ExprKind::Char(c) => write!(f, "'{}'", escape(*c)),
            ExprKind::Str(s) => write!(f, "\"{}\"", escape_str(s)),
            ExprKind::Null => f.write_str("null"),
            ExprKind::Var(name) => f.write_str(name),
            ExprKind::ArrayElem { name, indices } => {
                f.write_str(name)?;
                for index in indices.iter() {
                    write!(f, "[{index}]")?;
                }
                Ok(())
            }
            ExprKind::PairElem { side, pair } => write!(f, "{side} {pair}"),
            ExprKind::Unary { op, exp } => write!(f, "{op}{exp}"),
            ExprKind::Bin {
                operator,
                left,
                right,
            } => {
                let nested = |e: &Expr| matches!(e.kind, ExprKind::Bin { .. });
                if nested(left) {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                write!(f, " {operator} ")?;
                if nested(right) {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
            ExprKind::Call { name, args } => {
                write!(f, "call {name}(")?;
                comma_separated(f, args)?;
                f.write_str(")")
            }
            ExprKind::NewPair { fst, snd } => write!(f, "newpair({fst}, {snd})"),
            ExprKind::ArrayLit(elems) => {
                f.write_str("[")?;
                comma_separated(f, elems)?;
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn at(kind: ExprKind) -> Box<Expr> {
        Box::new(Expr::new(kind, Pos::default()))
    }

    #[test]
    fn renders_nested_binaries_with_parens() {
        let inner = ExprKind::Bin {
            operator: Bop::Add,
            left: at(ExprKind::Var("x".into())),
            right: at(ExprKind::Int(1)),
        };
        let outer = Expr::new(
            ExprKind::Bin {
                operator: Bop::Multiply,
                left: at(inner),
                right: at(ExprKind::Char(b'\n')),
            },
            Pos::default(),
        );
        assert_eq!(outer.to_string(), "(x + 1) * '\\n'");
    }

    #[test]
    fn precedence_bands() {
        assert!(Bop::Multiply.precedence() > Bop::Add.precedence());
        assert!(Bop::Add.precedence() > Bop::Leq.precedence());
        assert!(Bop::Leq.precedence() > Bop::EqualTo.precedence());
        assert!(Bop::EqualTo.precedence() > Bop::LogAnd.precedence());
        assert!(Bop::LogAnd.precedence() > Bop::LogOr.precedence());
        assert_eq!(Bop::Remainder.kind(), BopKind::Arithmetic);
    }
}

//! The checked program handed from semantic analysis to code generation.
//!
//! Every expression carries its resolved type, calls name the exact overload
//! they resolved to, and source positions are gone.

pub use crate::expr::{Bop, PairSide, UnOp};
use crate::{Arr, Ident, Type};

#[derive(Debug, Clone)]
pub struct Program {
    pub funcs: Arr<Func>,
    pub body: Stmnt,
}

#[derive(Debug, Clone)]
pub struct Func {
    pub name: Ident,
    pub label: Ident,
    pub params: Arr<Param>,
    pub ret: Type,
    pub body: Stmnt,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Stmnt {
    Skip,
    Decl { name: Ident, ty: Type, init: Expr },
    Assign { dst: Expr, src: Expr },
    Read(Expr),
    Free(Expr),
    Return(Expr),
    Exit(Expr),
    Print { exp: Expr, newline: bool },
    If {
        condition: Expr,
        then: Box<Stmnt>,
        r#else: Box<Stmnt>,
    },
    While { condition: Expr, body: Box<Stmnt> },
    Scope(Box<Stmnt>),
    Seq(Arr<Stmnt>),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
}

impl Expr {
    pub const fn new(kind: ExprKind, ty: Type) -> Self {
        Self { kind, ty }
    }
}

#[derive(Debug, Clone)]
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
    Call {
        label: Ident,
        args: Arr<Expr>,
    },
    NewPair {
        fst: Box<Expr>,
        snd: Box<Expr>,
    },
    ArrayLit(Arr<Expr>),
}

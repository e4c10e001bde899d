pub use crate::expr::{Expr, ExprKind};
use crate::{Arr, Ident, Pos};

#[derive(Debug, Clone)]
pub struct Program {
    pub funcs: Arr<Func>,
    pub body: Stmnt,
}

#[derive(Debug, Clone)]
pub struct Func {
    pub name: Ident,
    pub ret: TypeNode,
    pub params: Arr<Param>,
    pub body: Stmnt,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub typ: TypeNode,
    pub name: Ident,
    pub pos: Pos,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BaseType {
    Int,
    Bool,
    Char,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Base(BaseType),
    /// `elem` is never itself an array: `int[][]` is one node with `dims: 2`.
    Array {
        elem: Box<TypeNode>,
        dims: u32,
    },
    /// `None` marks the bare `pair` keyword used as an element type.
    Pair(Option<Box<TypeNode>>, Option<Box<TypeNode>>),
}

#[derive(Debug, Clone)]
pub struct Stmnt {
    pub kind: StmntKind,
    pub pos: Pos,
}

impl Stmnt {
    pub const fn new(kind: StmntKind, pos: Pos) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone)]
pub enum StmntKind {
    Skip,
    Decl {
        typ: TypeNode,
        name: Ident,
        init: Expr,
    },
    Assign {
        dst: Expr,
        src: Expr,
    },
    Read(Expr),
    Free(Expr),
    Return(Expr),
    Exit(Expr),
    Print {
        exp: Expr,
        newline: bool,
    },
    If {
        condition: Expr,
        then: Box<Stmnt>,
        r#else: Box<Stmnt>,
    },
    While {
        condition: Expr,
        body: Box<Stmnt>,
    },
    Scope(Box<Stmnt>),
    Seq(Arr<Stmnt>),
}

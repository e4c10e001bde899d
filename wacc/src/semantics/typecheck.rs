use super::Error as SemanticError;
use crate::parse::{Program, Stmnt, StmntKind};
use ast::expr::BopKind;
use ast::{typed, Arr, Expr, ExprKind, Ident, Pos, Type, UnOp};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use symtab::{Binding, Resolution, ScopeId, SymbolTable};

#[derive(Debug, Clone)]
pub enum Decl {
    Var(Type),
    /// `ty` is always a `Type::Function`.
    Fn { label: Ident, ty: Type },
}

impl Decl {
    const fn is_var(&self) -> bool {
        matches!(self, Self::Var(_))
    }

    const fn is_fn(&self) -> bool {
        matches!(self, Self::Fn { .. })
    }

    fn params(&self) -> Option<&[Type]> {
        match self {
            Self::Fn { ty, .. } => ty.params(),
            Self::Var(_) => None,
        }
    }
}

impl Binding for Decl {
    // overloads may share a name as long as their parameter lists differ
    fn collides(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Fn { .. }, Self::Fn { .. }) => self.params() == other.params(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    Exactly(Type),
    IntOrChar,
    Array,
    PairOrArray,
}

impl Display for Expect {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Exactly(ty) => write!(f, "{ty}"),
            Self::IntOrChar => f.write_str("INT or CHAR"),
            Self::Array => f.write_str("T[]"),
            Self::PairOrArray => f.write_str("PAIR or T[]"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("\"{0}\" is already defined in this scope")]
    Redeclaration(String),
    #[error("\"{0}\" is not defined in this scope")]
    Undeclared(Ident),
    #[error("Incompatible type at \"{expr}\" (expected: {expected}, actual: {actual})")]
    Mismatch {
        expr: String,
        expected: Expect,
        actual: Type,
    },
    #[error("\"{name}({args})\" is not defined in this scope")]
    NoOverload { name: Ident, args: String },
    #[error("Cannot return from the global scope.")]
    GlobalReturn,
}

type Result<T> = std::result::Result<T, SemanticError>;

fn fail<T>(pos: Pos, error: Error) -> Result<T> {
    Err(SemanticError::Semantic { pos, error })
}

fn mismatch<T>(exp: &Expr, expected: Expect, actual: &Type) -> Result<T> {
    fail(
        exp.pos,
        Error::Mismatch {
            expr: exp.to_string(),
            expected,
            actual: actual.clone(),
        },
    )
}

fn expect(exp: &Expr, checked: &typed::Expr, want: &Type) -> Result<()> {
    if &checked.ty == want {
        Ok(())
    } else {
        mismatch(exp, Expect::Exactly(want.clone()), &checked.ty)
    }
}

fn type_list(types: &[Type]) -> String {
    types
        .iter()
        .map(Type::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Copy, Clone)]
struct Context<'r> {
    scope: ScopeId,
    ret: Option<&'r Type>,
}

struct Checker {
    table: SymbolTable<Decl>,
}

pub fn check(program: &Program) -> Result<typed::Program> {
    let mut checker = Checker {
        table: SymbolTable::new(),
    };
    let root = checker.table.root();

    // every signature is visible in every body, so bind them all up front
    let labels = labels(program);
    let mut signatures = Vec::with_capacity(program.funcs.len());
    for (func, label) in program.funcs.iter().zip(labels) {
        let params: Arr<Type> = func.params.iter().map(|p| Type::from(&p.typ)).collect();
        let ret = Type::from(&func.ret);
        let signature = format!("{}({})", func.name, type_list(&params));
        let ty = Type::Function {
            ret: Box::new(ret.clone()),
            params: params.clone(),
        };
        let decl = Decl::Fn {
            label: label.clone(),
            ty,
        };
        if checker
            .table
            .declare_local(root, func.name.clone(), decl)
            .is_err()
        {
            return fail(func.pos, Error::Redeclaration(signature));
        }
        signatures.push((label, params, ret));
    }

    let mut funcs = Vec::with_capacity(program.funcs.len());
    for (func, (label, params, ret)) in program.funcs.iter().zip(signatures) {
        log::debug!("checking {label}");
        let scope = checker.table.child(root);
        let mut typed_params = Vec::with_capacity(params.len());
        for (param, ty) in func.params.iter().zip(params.iter()) {
            checker.declare(scope, &param.name, ty.clone(), param.pos)?;
            typed_params.push(typed::Param {
                name: param.name.clone(),
                ty: ty.clone(),
            });
        }
        let ctx = Context {
            scope,
            ret: Some(&ret),
        };
        let body = checker.statement(&func.body, ctx)?;
        funcs.push(typed::Func {
            name: func.name.clone(),
            label,
            params: typed_params.into(),
            ret: ret.clone(),
            body,
        });
    }

    let ctx = Context {
        scope: checker.table.child(root),
        ret: None,
    };
    let body = checker.statement(&program.body, ctx)?;
    Ok(typed::Program {
        funcs: funcs.into(),
        body,
    })
}

/// `f_<name>`, or `f_<name>_<k>` for the `k`th of several overloads.
fn labels(program: &Program) -> Vec<Ident> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for func in program.funcs.iter() {
        *counts.entry(&func.name).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    program
        .funcs
        .iter()
        .map(|func| {
            let k = seen.entry(&func.name).or_default();
            let label = if counts[func.name.as_ref()] > 1 {
                format!("f_{}_{k}", func.name)
            } else {
                format!("f_{}", func.name)
            };
            *k += 1;
            label.into()
        })
        .collect()
}

impl Checker {
    fn declare(&mut self, scope: ScopeId, name: &Ident, ty: Type, pos: Pos) -> Result<()> {
        self.table
            .declare_local(scope, name.clone(), Decl::Var(ty))
            .or_else(|e| fail(pos, Error::Redeclaration(e.0.to_string())))
    }

    fn child<'r>(&mut self, ctx: Context<'r>) -> Context<'r> {
        Context {
            scope: self.table.child(ctx.scope),
            ..ctx
        }
    }

    fn statement(&mut self, stmnt: &Stmnt, ctx: Context) -> Result<typed::Stmnt> {
        Ok(match &stmnt.kind {
            StmntKind::Skip => typed::Stmnt::Skip,
            StmntKind::Decl { typ, name, init } => {
                let ty = Type::from(typ);
                let checked = self.expression(init, ctx)?;
                expect(init, &checked, &ty)?;
                self.declare(ctx.scope, name, ty.clone(), stmnt.pos)?;
                typed::Stmnt::Decl {
                    name: name.clone(),
                    ty,
                    init: checked,
                }
            }
            StmntKind::Assign { dst, src } => {
                let dst = self.expression(dst, ctx)?;
                let checked = self.expression(src, ctx)?;
                expect(src, &checked, &dst.ty)?;
                typed::Stmnt::Assign { dst, src: checked }
            }
            StmntKind::Read(target) => {
                let checked = self.expression(target, ctx)?;
                if !matches!(checked.ty, Type::Int | Type::Char) {
                    return mismatch(target, Expect::IntOrChar, &checked.ty);
                }
                typed::Stmnt::Read(checked)
            }
            StmntKind::Free(exp) => {
                let checked = self.expression(exp, ctx)?;
                if !matches!(checked.ty, Type::Pair(..) | Type::Array { .. }) {
                    return mismatch(exp, Expect::PairOrArray, &checked.ty);
                }
                typed::Stmnt::Free(checked)
            }
            StmntKind::Return(exp) => {
                let Some(ret) = ctx.ret else {
                    return fail(stmnt.pos, Error::GlobalReturn);
                };
                let checked = self.expression(exp, ctx)?;
                expect(exp, &checked, ret)?;
                typed::Stmnt::Return(checked)
            }
            StmntKind::Exit(exp) => {
                let checked = self.expression(exp, ctx)?;
                expect(exp, &checked, &Type::Int)?;
                typed::Stmnt::Exit(checked)
            }
            StmntKind::Print { exp, newline } => typed::Stmnt::Print {
                exp: self.expression(exp, ctx)?,
                newline: *newline,
            },
            StmntKind::If {
                condition,
                then,
                r#else,
            } => {
                let checked = self.expression(condition, ctx)?;
                expect(condition, &checked, &Type::Bool)?;
                let then_ctx = self.child(ctx);
                let then = self.statement(then, then_ctx)?;
                let else_ctx = self.child(ctx);
                let r#else = self.statement(r#else, else_ctx)?;
                typed::Stmnt::If {
                    condition: checked,
                    then: Box::new(then),
                    r#else: Box::new(r#else),
                }
            }
            StmntKind::While { condition, body } => {
                let checked = self.expression(condition, ctx)?;
                expect(condition, &checked, &Type::Bool)?;
                let body_ctx = self.child(ctx);
                typed::Stmnt::While {
                    condition: checked,
                    body: Box::new(self.statement(body, body_ctx)?),
                }
            }
            StmntKind::Scope(body) => {
                let body_ctx = self.child(ctx);
                typed::Stmnt::Scope(Box::new(self.statement(body, body_ctx)?))
            }
            StmntKind::Seq(seq) => typed::Stmnt::Seq(
                seq.iter()
                    .map(|s| self.statement(s, ctx))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn variable(&self, name: &Ident, pos: Pos, ctx: Context) -> Result<Type> {
        match self.table.lookup_chain(ctx.scope, name, Decl::is_var) {
            Some(Decl::Var(ty)) => Ok(ty.clone()),
            _ => fail(pos, Error::Undeclared(name.clone())),
        }
    }

    fn expression(&mut self, exp: &Expr, ctx: Context) -> Result<typed::Expr> {
        let (kind, ty) = match &exp.kind {
            ExprKind::Int(i) => (typed::ExprKind::Int(*i), Type::Int),
            ExprKind::Bool(b) => (typed::ExprKind::Bool(*b), Type::Bool),
            ExprKind::Char(c) => (typed::ExprKind::Char(*c), Type::Char),
            ExprKind::Str(s) => (typed::ExprKind::Str(s.clone()), Type::Str),
            ExprKind::Null => (typed::ExprKind::Null, Type::wildcard_pair()),
            ExprKind::Var(name) => (
                typed::ExprKind::Var(name.clone()),
                self.variable(name, exp.pos, ctx)?,
            ),
            ExprKind::ArrayElem { name, indices } => {
                let array = self.variable(name, exp.pos, ctx)?;
                let mut checked = Vec::with_capacity(indices.len());
                for index in indices.iter() {
                    let index_checked = self.expression(index, ctx)?;
                    expect(index, &index_checked, &Type::Int)?;
                    checked.push(index_checked);
                }
                let Some(ty) = u32::try_from(indices.len())
                    .ok()
                    .and_then(|n| array.index(n))
                else {
                    return mismatch(exp, Expect::Array, &array);
                };
                let kind = typed::ExprKind::ArrayElem {
                    name: name.clone(),
                    indices: checked.into(),
                };
                (kind, ty)
            }
            ExprKind::PairElem { side, pair } => {
                let checked = self.expression(pair, ctx)?;
                let Some(ty) = checked.ty.side(*side) else {
                    return mismatch(
                        pair,
                        Expect::Exactly(Type::wildcard_pair()),
                        &checked.ty,
                    );
                };
                let kind = typed::ExprKind::PairElem {
                    side: *side,
                    pair: Box::new(checked),
                };
                (kind, ty)
            }
            ExprKind::Unary { op, exp: operand } => {
                let checked = self.expression(operand, ctx)?;
                let ty = match op {
                    UnOp::Not => {
                        expect(operand, &checked, &Type::Bool)?;
                        Type::Bool
                    }
                    UnOp::Negate => {
                        expect(operand, &checked, &Type::Int)?;
                        Type::Int
                    }
                    UnOp::Len => {
                        if !checked.ty.is_array() {
                            return mismatch(operand, Expect::Array, &checked.ty);
                        }
                        Type::Int
                    }
                    UnOp::Ord => {
                        expect(operand, &checked, &Type::Char)?;
                        Type::Int
                    }
                    UnOp::Chr => {
                        expect(operand, &checked, &Type::Int)?;
                        Type::Char
                    }
                };
                let kind = typed::ExprKind::Unary {
                    op: *op,
                    exp: Box::new(checked),
                };
                (kind, ty)
            }
            ExprKind::Bin {
                operator,
                left,
                right,
            } => {
                let l = self.expression(left, ctx)?;
                let r = self.expression(right, ctx)?;
                let ty = match operator.kind() {
                    BopKind::Arithmetic => {
                        expect(left, &l, &Type::Int)?;
                        expect(right, &r, &Type::Int)?;
                        Type::Int
                    }
                    BopKind::Ordering => {
                        if !matches!(l.ty, Type::Int | Type::Char) {
                            return mismatch(left, Expect::IntOrChar, &l.ty);
                        }
                        expect(right, &r, &l.ty)?;
                        Type::Bool
                    }
                    BopKind::Equality => {
                        expect(right, &r, &l.ty)?;
                        Type::Bool
                    }
                    BopKind::Logical => {
                        expect(left, &l, &Type::Bool)?;
                        expect(right, &r, &Type::Bool)?;
                        Type::Bool
                    }
                };
                let kind = typed::ExprKind::Bin {
                    operator: *operator,
                    left: Box::new(l),
                    right: Box::new(r),
                };
                (kind, ty)
            }
            ExprKind::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.expression(a, ctx))
                    .collect::<Result<Vec<_>>>()?;
                let types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
                let resolution = self.table.resolve(ctx.scope, name, Decl::is_fn, |d| {
                    d.params() == Some(types.as_slice())
                });
                let Resolution::Found(Decl::Fn { label, ty }) = resolution else {
                    return fail(
                        exp.pos,
                        Error::NoOverload {
                            name: name.clone(),
                            args: type_list(&types),
                        },
                    );
                };
                let ret = ty.ret().cloned().unwrap_or(Type::Int);
                let kind = typed::ExprKind::Call {
                    label: label.clone(),
                    args: args.into(),
                };
                (kind, ret)
            }
            ExprKind::NewPair { fst, snd } => {
                let fst = self.expression(fst, ctx)?;
                let snd = self.expression(snd, ctx)?;
                let ty = Type::pair(fst.ty.clone().erased(), snd.ty.clone().erased());
                let kind = typed::ExprKind::NewPair {
                    fst: Box::new(fst),
                    snd: Box::new(snd),
                };
                (kind, ty)
            }
            ExprKind::ArrayLit(elems) => {
                let mut checked: Vec<typed::Expr> = Vec::with_capacity(elems.len());
                for elem in elems.iter() {
                    let elem_checked = self.expression(elem, ctx)?;
                    if let Some(first) = checked.first() {
                        expect(elem, &elem_checked, &first.ty)?;
                    }
                    checked.push(elem_checked);
                }
                let ty = match checked.first() {
                    Some(first) => Type::array_of(first.ty.clone()),
                    None => Type::empty_array(),
                };
                (typed::ExprKind::ArrayLit(checked.into()), ty)
            }
        };
        Ok(typed::Expr::new(kind, ty))
    }
}

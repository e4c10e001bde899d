use crate::parse::{Program, Stmnt, StmntKind};
use ast::Ident;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("Function {0} is not ended with a return or an exit statement.")]
    MissingTerminator(Ident),
}

pub fn check(program: &Program) -> Result<(), super::Error> {
    for func in program.funcs.iter() {
        if !terminates(&func.body) {
            return Err(super::Error::Structural {
                pos: func.pos,
                error: Error::MissingTerminator(func.name.clone()),
            });
        }
    }
    Ok(())
}

/// Whether control can never fall off the end of `stmnt`. A sequence only
/// counts when its last statement does.
pub fn terminates(stmnt: &Stmnt) -> bool {
    match &stmnt.kind {
        StmntKind::Return(_) | StmntKind::Exit(_) => true,
        StmntKind::If { then, r#else, .. } => terminates(then) && terminates(r#else),
        StmntKind::While { body, .. } | StmntKind::Scope(body) => terminates(body),
        StmntKind::Seq(seq) => seq.last().is_some_and(terminates),
        StmntKind::Skip
        | StmntKind::Decl { .. }
        | StmntKind::Assign { .. }
        | StmntKind::Read(_)
        | StmntKind::Free(_)
        | StmntKind::Print { .. } => false,
    }
}

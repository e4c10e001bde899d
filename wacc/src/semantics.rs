pub mod terminate;
pub mod typecheck;

use crate::parse::Program;
use ast::{typed, Pos};

/// Type checks `program` and verifies that every function body terminates.
/// The first problem found aborts the check.
pub fn check(program: &Program) -> Result<typed::Program, Error> {
    let typed = typecheck::check(program)?;
    terminate::check(program)?;
    Ok(typed)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("Semantic Error at {pos} -- {error}")]
    Semantic { pos: Pos, error: typecheck::Error },
    #[error("Semantic Error at {pos} -- {error}")]
    Structural { pos: Pos, error: terminate::Error },
}

impl Error {
    pub const fn pos(&self) -> Pos {
        match self {
            Self::Semantic { pos, .. } | Self::Structural { pos, .. } => *pos,
        }
    }
}

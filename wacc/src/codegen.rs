mod arm_pass;
pub mod frame;
pub mod regs;
pub mod runtime;

use ast::{typed, Ident};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no stack slot for \"{0}\"")]
    Unbound(Ident),
    #[error("undefined labels in output: {0}")]
    Unresolved(String),
}

pub fn generate(program: &typed::Program) -> Result<String, Error> {
    let asm = arm_pass::emit(program)?;
    log::debug!(
        "emitted {} lines and {} constants",
        asm.text.len(),
        asm.data.len()
    );
    Ok(asm.to_string())
}

pub mod args;
pub mod codegen;
pub mod lex;
pub mod parse;
pub mod semantics;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use ast::{DebugToken, Token};

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub stage: Option<CompileStage>,
    /// Where to write the assembly. Defaults to the source path with an `.s`
    /// extension.
    pub output: Option<PathBuf>,
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum CompileStage {
    Lex,
    Parse,
    Validate,
}

pub fn compile(path: &Path, config: &Config) -> Result<Option<PathBuf>, Error> {
    let source = fs::read(path)?;
    log::info!("compiling {}", path.display());
    let Some(code) = run(&source, config.stage)? else {
        return Ok(None);
    };
    let output = config
        .output
        .clone()
        .unwrap_or_else(|| path.with_extension("s"));
    fs::write(&output, code)?;
    log::info!("wrote {}", output.display());
    Ok(Some(output))
}

pub fn compile_str(source: &str) -> Result<String, Error> {
    run(source.as_bytes(), None).map(Option::unwrap_or_default)
}

fn run(source: &[u8], stage: Option<CompileStage>) -> Result<Option<String>, Error> {
    let tokens = lex::tokenize(source)?;
    log::info!("lexed {} tokens", tokens.len());
    if !should_parse(stage) {
        return Ok(None);
    }

    let program = parse::parse(tokens)?;
    log::info!("parsed {} functions", program.funcs.len());
    if !should_validate(stage) {
        return Ok(None);
    }

    let program = semantics::check(&program)?;
    log::info!("program is well formed");
    if !should_codegen(stage) {
        return Ok(None);
    }

    let code = codegen::generate(&program)?;
    log::info!("generated {} bytes of assembly", code.len());
    Ok(Some(code))
}

const fn should_parse(s: Option<CompileStage>) -> bool {
    !matches!(s, Some(CompileStage::Lex))
}

const fn should_validate(s: Option<CompileStage>) -> bool {
    should_parse(s) && !matches!(s, Some(CompileStage::Parse))
}

const fn should_codegen(s: Option<CompileStage>) -> bool {
    should_validate(s) && !matches!(s, Some(CompileStage::Validate))
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Syntax Error at {} -- {}", .0.pos(), .0)]
    Lexing(#[from] lex::Error),
    #[error("Syntax Error at {} -- {}", .0.pos(), .0)]
    Parsing(#[from] parse::Error),
    #[error(transparent)]
    Semantics(#[from] semantics::Error),
    #[error("Code generation: {0}")]
    Codegen(#[from] codegen::Error),
}

impl Error {
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::Lexing(_) | Self::Parsing(_))
    }

    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Lexing(_) | Self::Parsing(_) => 100,
            Self::Semantics(_) => 200,
            Self::Io(_) | Self::Codegen(_) => 1,
        }
    }
}

use thiserror::Error;

use crate::{lex::LexError, parse::ParseError, walker::ExecError};

/// Anything that can stop a run, from any stage of the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

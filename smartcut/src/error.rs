//! CLI-specific error types that wrap [`smartcut_core::CutError`] with the
//! process exit-code contract for the command-line front end.

use smartcut_core::CutError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Cut(#[from] CutError),

    #[error("invalid arguments: {0}")]
    Args(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Cut(e) => e.exit_code(),
            CliError::Args(_) => 2,
            CliError::Io(_) => 6,
        }
    }
}

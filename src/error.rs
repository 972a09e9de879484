use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed command line. The line is discarded and the loop continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("redirection '{0}' is missing a file name")]
    MissingRedirectTarget(String),
    #[error("unterminated quote in '{0}'")]
    UnterminatedQuote(String),
    #[error("syntax error near unexpected token '|'")]
    EmptyStage,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Sys(#[from] nix::errno::Errno),
    #[error("{}: {source}", path.display())]
    Redirect { path: PathBuf, source: io::Error },
    #[error("{}: {source}", path.display())]
    ChangeDir { path: PathBuf, source: io::Error },
}

pub type Result<T, E = ShellError> = std::result::Result<T, E>;

use std::io;
use std::path::PathBuf;
use symtrace_ast::ResolveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("no symbol at {address}")]
    SymbolNotFound { address: String },

    #[error("no symbol encloses {}:{line}", file.display())]
    NoEnclosingSymbol { file: PathBuf, line: usize },

    #[error("{failed} of {total} files could not be indexed")]
    IndexFailures { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

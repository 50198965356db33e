//! Error and diagnostic types for symbol resolution

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to detect language for file: {0}")]
    LanguageDetectionFailed(String),

    #[error("Parser error: {0}")]
    ParserError(String),

    #[error("Invalid syntax tree for {file}: {reason}")]
    InvalidTree { file: String, reason: String },

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid symbol address: {0}")]
    InvalidAddress(String),

    #[error("File too large: {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge { size: usize, max: usize },
}

pub type ResolveResult<T> = Result<T, ResolveError>;

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Non-fatal conditions observed while building a code map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The parser produced an `ERROR` node or inserted a `MISSING` token.
    UnparsableNode { line: usize },

    /// A definition had no derivable name and was given a fallback path.
    NamelessDefinition { line: usize, path: String },

    /// A source name has the shape of a generated segment and was
    /// addressed with a trailing `_`.
    ReservedName { line: usize, name: String },

    /// Two definitions computed the same path; only `kept_line` survives.
    PathCollision {
        path: String,
        kept_line: usize,
        dropped_line: usize,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnparsableNode { line } => write!(f, "line {line}: unparsable node"),
            Self::NamelessDefinition { line, path } => {
                write!(f, "line {line}: nameless definition addressed as {path}")
            }
            Self::ReservedName { line, name } => {
                write!(f, "line {line}: name {name} is reserved, addressed as {name}_")
            }
            Self::PathCollision {
                path,
                kept_line,
                dropped_line,
            } => write!(
                f,
                "path collision on {path}: kept line {kept_line}, dropped line {dropped_line}"
            ),
        }
    }
}

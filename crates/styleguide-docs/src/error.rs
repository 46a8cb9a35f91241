use std::fmt;
use std::path::PathBuf;

use docs_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("index error: {0}")]
    Index(String),
}

/// Failure attached to a single document. Never aborts the rest of a
/// traversal; the two variants stay apart so callers can skip-and-log a
/// malformed page yet abort on I/O trouble.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("malformed document {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: MalformedReason },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Malformed { path, .. } | Self::Io { path, .. } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::Io { .. } => "io",
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// The file does not open with a `---` line.
    MissingFrontmatter,
    /// Opening `---` without a closing one.
    UnterminatedFrontmatter,
    InvalidYaml(String),
    MissingField(&'static str),
    EmptyField(&'static str),
    InvalidUtf8,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFrontmatter => f.write_str("missing frontmatter"),
            Self::UnterminatedFrontmatter => f.write_str("frontmatter is not closed by '---'"),
            Self::InvalidYaml(msg) => write!(f, "invalid frontmatter yaml: {msg}"),
            Self::MissingField(field) => write!(f, "frontmatter field '{field}' is missing"),
            Self::EmptyField(field) => write!(f, "frontmatter field '{field}' is empty"),
            Self::InvalidUtf8 => f.write_str("file is not valid UTF-8"),
        }
    }
}

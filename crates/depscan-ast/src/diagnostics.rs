//! Per-file and per-call-site problems collected during analysis

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Go parse error in {path:?} at line {line}")]
    Parse { path: PathBuf, line: usize },
}

impl SourceError {
    pub fn path(&self) -> &PathBuf {
        match self {
            SourceError::Io { path, .. } | SourceError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The file could not be read
    Unreadable { reason: String },
    /// The file does not parse as Go and was skipped
    ParseError,
    /// A wrapper call site passes fewer arguments than the wrapper reads
    ArgumentCountMismatch {
        wrapper: String,
        expected_index: usize,
        provided: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    /// 1-based, 0 when the problem concerns the whole file
    pub line: usize,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn argument_count_mismatch(
        path: PathBuf,
        line: usize,
        wrapper: &str,
        expected_index: usize,
        provided: usize,
    ) -> Self {
        Diagnostic {
            path,
            line,
            kind: DiagnosticKind::ArgumentCountMismatch {
                wrapper: wrapper.to_string(),
                expected_index,
                provided,
            },
        }
    }
}

impl Diagnostic {
    /// A file or directory that could not be read, for the whole path
    pub fn unreadable(path: PathBuf, reason: impl Into<String>) -> Self {
        Diagnostic {
            path,
            line: 0,
            kind: DiagnosticKind::Unreadable {
                reason: reason.into(),
            },
        }
    }
}

impl From<&SourceError> for Diagnostic {
    fn from(err: &SourceError) -> Self {
        match err {
            SourceError::Io { path, source } => Diagnostic::unreadable(path.clone(), source.to_string()),
            SourceError::Parse { path, line } => Diagnostic {
                path: path.clone(),
                line: *line,
                kind: DiagnosticKind::ParseError,
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = if self.line > 0 {
            format!("{}:{}", self.path.display(), self.line)
        } else {
            self.path.display().to_string()
        };

        match &self.kind {
            DiagnosticKind::Unreadable { reason } => {
                write!(f, "{}: unreadable source file ({})", location, reason)
            }
            DiagnosticKind::ParseError => write!(f, "{}: Go parse error, file skipped", location),
            DiagnosticKind::ArgumentCountMismatch {
                wrapper,
                expected_index,
                provided,
            } => write!(
                f,
                "{}: call to '{}' passes {} argument(s) but argument {} is required",
                location,
                wrapper,
                provided,
                expected_index + 1
            ),
        }
    }
}

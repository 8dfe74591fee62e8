//! Centralized error types for the depscan CLI

use depscan_manifest::ManifestError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Analysis aborted: {0}")]
    Analysis(#[from] anyhow::Error),

    #[error("{failed} of {total} manifest(s) could not be written")]
    ManifestWrites { failed: usize, total: usize },
}

#[cfg(test)]
mod tests {
    use crate::errors::*;

    #[test]
    fn test_cli_error_display() {
        let err = CliError::Config("Unknown configuration key 'foo'".to_string());
        assert_eq!(err.to_string(), "Unknown configuration key 'foo'");

        let err = CliError::from(anyhow::anyhow!("Go parse error in \"a.go\" at line 3"));
        assert_eq!(
            err.to_string(),
            "Analysis aborted: Go parse error in \"a.go\" at line 3"
        );

        let err = CliError::ManifestWrites { failed: 1, total: 2 };
        assert_eq!(err.to_string(), "1 of 2 manifest(s) could not be written");
    }
}

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading descriptors or writing manifests
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse descriptor: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid descriptor {}: {reason}", .path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_descriptor_display() {
        let err = ManifestError::InvalidDescriptor {
            path: PathBuf::from("deploy/app.yaml"),
            reason: "missing kind".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid descriptor deploy/app.yaml: missing kind"
        );
    }
}

//! Writes TCP manifests as JSON files named `<prefix><service>.json`

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::ManifestError;
use crate::types::TcpManifest;

/// Output path for a service's manifest
///
/// The prefix is prepended verbatim, so `output/` yields a file inside the
/// `output` directory while `out-` yields `out-<service>.json`.
pub fn manifest_path(output_prefix: &str, service: &str) -> PathBuf {
    PathBuf::from(format!("{}{}.json", output_prefix, service))
}

/// Serialize a manifest as pretty JSON with a one-space indent
pub fn to_json_bytes(manifest: &TcpManifest) -> Result<Vec<u8>, ManifestError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    manifest.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write a manifest, creating the parent directory and overwriting any existing file
pub fn write_manifest(manifest: &TcpManifest, output_prefix: &str) -> Result<PathBuf, ManifestError> {
    let path = manifest_path(output_prefix, &manifest.service);
    write_to_path(manifest, &path)?;
    Ok(path)
}

pub fn write_to_path(manifest: &TcpManifest, output_path: &Path) -> Result<(), ManifestError> {
    debug!("Writing manifest to: {:?}", output_path);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = to_json_bytes(manifest)?;
    fs::write(output_path, bytes)?;

    info!(
        "Manifest for '{}' written to {:?} ({} request(s))",
        manifest.service,
        output_path,
        manifest.requests.len()
    );

    Ok(())
}

pub fn read_from_path(manifest_path: &Path) -> Result<TcpManifest, ManifestError> {
    let content = fs::read_to_string(manifest_path)?;
    Ok(serde_json::from_str(&content)?)
}

//! Deployment descriptor loading
//!
//! A descriptor is a subset of a Kubernetes workload manifest. Only the
//! identifying metadata matters to the analyser; the pod template is parsed
//! so that malformed templates are reported, but is otherwise unused.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::ManifestError;
use crate::types::ApplicationDescriptor;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentDescriptor {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: WorkloadSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: String,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub app: Option<serde_yaml::Value>,
    pub version: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkloadSpec {
    pub template: PodTemplate,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodTemplate {
    pub metadata: TemplateMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateMeta {
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodSpec {
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub ports: Vec<ContainerPort>,
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_port: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvVar {
    pub name: String,
    pub value: Option<serde_yaml::Value>,
}

impl DeploymentDescriptor {
    /// A descriptor is usable when both `apiVersion` and `kind` are set
    pub fn is_valid(&self) -> bool {
        !self.api_version.trim().is_empty() && !self.kind.trim().is_empty()
    }

    pub fn version(&self) -> String {
        self.metadata
            .labels
            .version
            .as_ref()
            .map(scalar_to_string)
            .unwrap_or_default()
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Parse descriptor text, returning the first valid document
///
/// Files commonly bundle a Deployment and a Service separated by `---`.
pub fn parse_descriptor_str(content: &str, path: &Path) -> Result<DeploymentDescriptor, ManifestError> {
    let mut first_error = None;

    for document in serde_yaml::Deserializer::from_str(content) {
        match DeploymentDescriptor::deserialize(document) {
            Ok(descriptor) if descriptor.is_valid() => return Ok(descriptor),
            Ok(_) => {}
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(ManifestError::Yaml(err)),
        None => Err(ManifestError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason: "missing required fields apiVersion and kind".to_string(),
        }),
    }
}

/// Load one descriptor file into an application
pub fn load_descriptor(path: &Path) -> Result<ApplicationDescriptor, ManifestError> {
    let content = fs::read_to_string(path)?;
    let descriptor = parse_descriptor_str(&content, path)?;

    let service_name = descriptor.metadata.name.trim().to_string();
    if service_name.is_empty() {
        return Err(ManifestError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason: "missing metadata.name".to_string(),
        });
    }

    let source_directory = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(ApplicationDescriptor {
        service_name,
        version: descriptor.version(),
        source_directory,
        descriptor_path: path.to_path_buf(),
    })
}

/// A descriptor candidate that did not produce an application
#[derive(Debug, Clone)]
pub struct SkippedDescriptor {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of walking a tree for descriptors
#[derive(Debug, Clone, Default)]
pub struct DescriptorScan {
    /// Applications keyed by service name
    pub applications: BTreeMap<String, ApplicationDescriptor>,
    pub skipped: Vec<SkippedDescriptor>,
    /// Descriptors that replaced an earlier one with the same service name
    pub overridden: Vec<ApplicationDescriptor>,
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

/// Walk `root` and load every valid descriptor
///
/// When two descriptors declare the same service name the one visited last
/// wins; the replaced descriptor is recorded in `overridden`.
pub fn discover_applications(
    root: &Path,
    extensions: &[String],
) -> Result<DescriptorScan, ManifestError> {
    if !root.is_dir() {
        return Err(ManifestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("root directory not found: {}", root.display()),
        )));
    }

    let mut scan = DescriptorScan::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable path while scanning descriptors: {}", err);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, extensions) {
            continue;
        }

        match load_descriptor(path) {
            Ok(app) => {
                debug!(
                    "Descriptor {:?} declares service '{}' version '{}'",
                    path, app.service_name, app.version
                );
                if let Some(previous) = scan.applications.insert(app.service_name.clone(), app) {
                    warn!(
                        "Service '{}' declared more than once; {:?} replaces {:?}",
                        previous.service_name,
                        path,
                        previous.descriptor_path
                    );
                    scan.overridden.push(previous);
                }
            }
            Err(err) => {
                warn!("Error parsing descriptor {:?}: {}", path, err);
                scan.skipped.push(SkippedDescriptor {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        "Found {} application(s), skipped {} descriptor(s)",
        scan.applications.len(),
        scan.skipped.len()
    );

    Ok(scan)
}

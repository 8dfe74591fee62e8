//! depscan manifest management
//!
//! This crate owns everything on either side of the source analysis:
//! loading deployment descriptors into applications, the global service
//! directory filled by registration call sites, joining discovery call sites
//! against it, and writing the resulting TCP manifests as JSON.

pub mod assembler;
pub mod descriptor;
pub mod directory;
pub mod errors;
pub mod manifest_writer;
pub mod types;

pub use assembler::{ManifestAssembler, UnresolvedDiscovery};
pub use descriptor::{discover_applications, load_descriptor, DescriptorScan, SkippedDescriptor};
pub use directory::ServiceDirectory;
pub use errors::ManifestError;
pub use manifest_writer::{read_from_path, write_manifest, write_to_path};
pub use types::{ApplicationDescriptor, ServiceInfo, TcpManifest, TcpRequest, TCP_REQUEST_TYPE};

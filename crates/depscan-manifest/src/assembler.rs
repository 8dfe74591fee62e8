//! Joins discovery call sites with the global service directory

use tracing::debug;

use crate::directory::ServiceDirectory;
use crate::types::{ApplicationDescriptor, TcpManifest, TcpRequest};

/// What to do with a discovery call whose target was never registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnresolvedDiscovery {
    /// Keep the entry with empty `url`, `name` and `port`
    #[default]
    EmitEmpty,
    /// Drop the entry from the manifest
    Omit,
}

pub struct ManifestAssembler<'a> {
    directory: &'a ServiceDirectory,
    policy: UnresolvedDiscovery,
}

impl<'a> ManifestAssembler<'a> {
    pub fn new(directory: &'a ServiceDirectory, policy: UnresolvedDiscovery) -> Self {
        ManifestAssembler { directory, policy }
    }

    /// Request for one discovered service name, `None` when the policy drops it
    pub fn request_for(&self, service_name: &str) -> Option<TcpRequest> {
        match self.directory.lookup(service_name) {
            Some(info) => Some(TcpRequest::to_service(info)),
            None => {
                debug!("Discovery target '{}' is not registered", service_name);
                match self.policy {
                    UnresolvedDiscovery::EmitEmpty => Some(TcpRequest::unresolved()),
                    UnresolvedDiscovery::Omit => None,
                }
            }
        }
    }

    /// Build the manifest for one application from its discovered service names
    pub fn assemble(&self, app: &ApplicationDescriptor, discovered: &[String]) -> TcpManifest {
        let mut manifest = TcpManifest::for_application(app);
        manifest.requests = discovered
            .iter()
            .filter_map(|name| self.request_for(name))
            .collect();
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceInfo;
    use std::path::PathBuf;

    fn app(name: &str) -> ApplicationDescriptor {
        ApplicationDescriptor {
            service_name: name.to_string(),
            version: "v1".to_string(),
            source_directory: PathBuf::from(name),
            descriptor_path: PathBuf::from(name).join("deployment.yaml"),
        }
    }

    fn directory() -> ServiceDirectory {
        let mut directory = ServiceDirectory::new();
        directory.register(
            "login-service".to_string(),
            ServiceInfo {
                application: "login".to_string(),
                ip: "10.0.0.5".to_string(),
                port: "8083".to_string(),
            },
        );
        directory
    }

    #[test]
    fn test_assemble_joins_registered_service() {
        let directory = directory();
        let assembler = ManifestAssembler::new(&directory, UnresolvedDiscovery::EmitEmpty);

        let manifest = assembler.assemble(&app("game"), &["login-service".to_string()]);

        assert_eq!(manifest.service, "game");
        assert_eq!(manifest.version, "v1");
        assert_eq!(manifest.requests.len(), 1);
        assert_eq!(manifest.requests[0].url, "10.0.0.5");
        assert_eq!(manifest.requests[0].name, "login");
        assert_eq!(manifest.requests[0].port, "8083");
    }

    #[test]
    fn test_unregistered_target_emits_empty_request() {
        let directory = directory();
        let assembler = ManifestAssembler::new(&directory, UnresolvedDiscovery::EmitEmpty);

        let manifest = assembler.assemble(&app("game"), &["ghost".to_string()]);

        assert_eq!(manifest.requests.len(), 1);
        assert!(manifest.requests[0].is_unresolved());
    }

    #[test]
    fn test_unregistered_target_omitted_by_policy() {
        let directory = directory();
        let assembler = ManifestAssembler::new(&directory, UnresolvedDiscovery::Omit);

        let manifest = assembler.assemble(
            &app("game"),
            &["ghost".to_string(), "login-service".to_string()],
        );

        assert_eq!(manifest.requests.len(), 1);
        assert_eq!(manifest.requests[0].name, "login");
    }
}

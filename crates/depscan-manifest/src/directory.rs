use ahash::AHashMap;
use tracing::debug;

use crate::types::ServiceInfo;

/// Global table of registered services, keyed by logical service name
///
/// Shared across every application of a run: a service registered in one
/// application's sources is discovered from another's.
#[derive(Debug, Clone, Default)]
pub struct ServiceDirectory {
    entries: AHashMap<String, ServiceInfo>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration, replacing any earlier one for the same name
    pub fn register(&mut self, service_name: String, info: ServiceInfo) -> Option<ServiceInfo> {
        let previous = self.entries.insert(service_name.clone(), info);
        if let Some(ref old) = previous {
            debug!(
                "Service '{}' re-registered (previously by application '{}')",
                service_name, old.application
            );
        }
        previous
    }

    pub fn lookup(&self, service_name: &str) -> Option<&ServiceInfo> {
        self.entries.get(service_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by service name
    pub fn sorted_entries(&self) -> Vec<(&str, &ServiceInfo)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(name, info)| (name.as_str(), info))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(application: &str, port: &str) -> ServiceInfo {
        ServiceInfo {
            application: application.to_string(),
            ip: "localhost".to_string(),
            port: port.to_string(),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut directory = ServiceDirectory::new();
        assert!(directory.is_empty());

        directory.register("login-service".to_string(), info("login", "8083"));

        assert_eq!(directory.len(), 1);
        assert_eq!(
            directory.lookup("login-service").map(|i| i.port.as_str()),
            Some("8083")
        );
        assert!(directory.lookup("game-service").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut directory = ServiceDirectory::new();
        directory.register("svc".to_string(), info("first", "1"));
        let previous = directory.register("svc".to_string(), info("second", "2"));

        assert_eq!(previous.map(|p| p.application), Some("first".to_string()));
        assert_eq!(
            directory.lookup("svc").map(|i| i.application.as_str()),
            Some("second")
        );
    }

    #[test]
    fn test_sorted_entries() {
        let mut directory = ServiceDirectory::new();
        directory.register("b".to_string(), info("x", "1"));
        directory.register("a".to_string(), info("y", "2"));

        let names: Vec<&str> = directory.sorted_entries().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}

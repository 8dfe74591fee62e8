//! Core types shared by the descriptor loader, the analyser and the writer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request type emitted for every inferred downstream dependency
pub const TCP_REQUEST_TYPE: &str = "tcp";

/// One application discovered from a deployment descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    /// `metadata.name` of the descriptor; never empty
    pub service_name: String,
    /// `metadata.labels.version`, empty when absent
    pub version: String,
    /// Directory holding the descriptor; all sources below it belong to the application
    pub source_directory: PathBuf,
    pub descriptor_path: PathBuf,
}

/// Where a registered service can be reached, keyed by logical service name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Application whose sources performed the registration
    pub application: String,
    pub ip: String,
    pub port: String,
}

/// One inferred downstream TCP dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpRequest {
    #[serde(rename = "type")]
    pub request_type: String,
    pub url: String,
    pub name: String,
    pub port: String,
}

impl TcpRequest {
    /// Request pointing at a registered service
    pub fn to_service(info: &ServiceInfo) -> Self {
        TcpRequest {
            request_type: TCP_REQUEST_TYPE.to_string(),
            url: info.ip.clone(),
            name: info.application.clone(),
            port: info.port.clone(),
        }
    }

    /// Request for a discovery target nobody registered
    pub fn unresolved() -> Self {
        TcpRequest::to_service(&ServiceInfo::default())
    }

    pub fn is_unresolved(&self) -> bool {
        self.url.is_empty() && self.name.is_empty() && self.port.is_empty()
    }
}

/// Per-application output artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpManifest {
    pub service: String,
    pub version: String,
    #[serde(default)]
    pub requests: Vec<TcpRequest>,
}

impl TcpManifest {
    pub fn for_application(app: &ApplicationDescriptor) -> Self {
        TcpManifest {
            service: app.service_name.clone(),
            version: app.version.clone(),
            requests: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_request_serializes_type_field() -> Result<(), serde_json::Error> {
        let request = TcpRequest::to_service(&ServiceInfo {
            application: "login".to_string(),
            ip: "10.0.0.5".to_string(),
            port: "8083".to_string(),
        });

        let json = serde_json::to_value(&request)?;
        assert_eq!(json["type"], "tcp");
        assert_eq!(json["url"], "10.0.0.5");
        assert_eq!(json["name"], "login");
        assert_eq!(json["port"], "8083");
        Ok(())
    }

    #[test]
    fn test_unresolved_request_has_empty_fields() {
        let request = TcpRequest::unresolved();
        assert_eq!(request.request_type, "tcp");
        assert!(request.is_unresolved());
    }
}

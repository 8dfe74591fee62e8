//! Registry SDK entry points recognised by the analyser

use depscan_config::SdkConfig;

/// Names of the SDK primitives and their parameter-object types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkProfile {
    pub register_entry_point: String,
    pub register_param_type: String,
    pub discovery_entry_points: Vec<String>,
    pub discovery_param_types: Vec<String>,
}

impl Default for SdkProfile {
    fn default() -> Self {
        Self::nacos()
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

impl SdkProfile {
    /// The Nacos naming client (`naming_client.INamingClient`)
    pub fn nacos() -> Self {
        SdkProfile {
            register_entry_point: "RegisterInstance".to_string(),
            register_param_type: "RegisterInstanceParam".to_string(),
            discovery_entry_points: owned(&[
                "GetService",
                "SelectAllInstances",
                "SelectOneHealthyInstance",
                "SelectInstances",
                "Subscribe",
            ]),
            discovery_param_types: owned(&[
                "GetServiceParam",
                "SelectAllInstancesParam",
                "SelectOneHealthyInstanceParam",
                "SelectInstancesParam",
                "SubscribeParam",
            ]),
        }
    }

    /// Nacos defaults with any configured overrides applied
    pub fn from_config(config: Option<&SdkConfig>) -> Self {
        let mut profile = Self::nacos();
        let Some(config) = config else {
            return profile;
        };

        if let Some(ref entry) = config.register_entry_point {
            profile.register_entry_point = entry.clone();
        }
        if let Some(ref param) = config.register_param_type {
            profile.register_param_type = param.clone();
        }
        if let Some(ref entries) = config.discovery_entry_points {
            profile.discovery_entry_points = entries.clone();
        }
        if let Some(ref params) = config.discovery_param_types {
            profile.discovery_param_types = params.clone();
        }
        profile
    }

    pub fn is_discovery_entry_point(&self, name: &str) -> bool {
        self.discovery_entry_points.iter().any(|n| n == name)
    }

    pub fn is_discovery_param_type(&self, name: &str) -> bool {
        self.discovery_param_types.iter().any(|n| n == name)
    }

    /// Every entry point, used for the substring pre-filter
    pub fn all_entry_points(&self) -> Vec<String> {
        let mut names = vec![self.register_entry_point.clone()];
        names.extend(self.discovery_entry_points.iter().cloned());
        names
    }
}

//! Persistent configuration for depscan
//!
//! The configuration lives in a TOML file. Its location can be overridden
//! with the `DEPSCAN_CONFIG` environment variable, which is what the CLI
//! integration tests rely on for isolated runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default prefix prepended to `<service>.json` when writing manifests
pub const DEFAULT_OUTPUT_PREFIX: &str = "output/";

/// Descriptor extensions scanned when none are configured
pub const DEFAULT_DESCRIPTOR_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Keys accepted by `get`/`set`
pub const CONFIG_KEYS: &[&str] = &[
    "root",
    "output-prefix",
    "descriptor-extensions",
    "unresolved-discovery",
    "strict-parse",
];

pub type ConfigResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Overrides for the registry SDK entry points the analyser looks for
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SdkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_entry_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_param_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_entry_points: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_param_types: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor_extensions: Option<Vec<String>>,
    /// `emit-empty` (default) or `omit`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved_discovery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_parse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk: Option<SdkConfig>,
}

impl Config {
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var("DEPSCAN_CONFIG") {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        #[cfg(not(target_os = "windows"))]
        let base = dirs::home_dir().map(|home| home.join(".config"));

        #[cfg(target_os = "windows")]
        let base = dirs::config_dir();

        base.unwrap_or_else(|| PathBuf::from("."))
            .join("depscan")
            .join("depscan.toml")
    }

    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "root" => self.root.clone(),
            "output-prefix" => self.output_prefix.clone(),
            "descriptor-extensions" => self.descriptor_extensions.as_ref().map(|e| e.join(",")),
            "unresolved-discovery" => self.unresolved_discovery.clone(),
            "strict-parse" => self.strict_parse.map(|v| v.to_string()),
            _ => None,
        }
    }

    /// Set a key from its string form. Unknown keys and malformed values are rejected.
    pub fn set(&mut self, key: &str, value: String) -> Result<(), String> {
        match key {
            "root" => self.root = Some(value),
            "output-prefix" => self.output_prefix = Some(value),
            "descriptor-extensions" => {
                let extensions: Vec<String> = value
                    .split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_string())
                    .filter(|ext| !ext.is_empty())
                    .collect();
                if extensions.is_empty() {
                    return Err("descriptor-extensions needs at least one extension".to_string());
                }
                self.descriptor_extensions = Some(extensions);
            }
            "unresolved-discovery" => match value.as_str() {
                "emit-empty" | "omit" => self.unresolved_discovery = Some(value),
                other => {
                    return Err(format!(
                        "unresolved-discovery must be 'emit-empty' or 'omit', got '{}'",
                        other
                    ))
                }
            },
            "strict-parse" => {
                let parsed = value
                    .parse::<bool>()
                    .map_err(|_| format!("strict-parse must be true or false, got '{}'", value))?;
                self.strict_parse = Some(parsed);
            }
            other => return Err(format!("Unknown configuration key '{}'", other)),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
            && self.output_prefix.is_none()
            && self.descriptor_extensions.is_none()
            && self.unresolved_discovery.is_none()
            && self.strict_parse.is_none()
            && self.sdk.is_none()
    }

    pub fn values_iter(&self) -> Vec<(&str, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    pub fn get_output_prefix(&self) -> String {
        self.output_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string())
    }

    pub fn get_descriptor_extensions(&self) -> Vec<String> {
        self.descriptor_extensions.clone().unwrap_or_else(|| {
            DEFAULT_DESCRIPTOR_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect()
        })
    }

    pub fn omit_unresolved(&self) -> bool {
        self.unresolved_discovery.as_deref() == Some("omit")
    }

    pub fn strict_parse(&self) -> bool {
        self.strict_parse.unwrap_or(false)
    }
}

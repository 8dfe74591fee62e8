//! Common types and utilities shared across modules

use clap::Parser;
use depscan_config::Config;
use std::path::PathBuf;

use crate::errors::CliError;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn load_config() -> Result<Config, CliError> {
    Config::load().map_err(|e| CliError::Config(format!("Failed to load config: {}", e)))
}

/// Root to scan: the argument, then the configured root, then the current directory
pub fn resolve_root(arg: Option<PathBuf>, config: &Config) -> PathBuf {
    arg.or_else(|| config.root.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbose() {
        let opts = GlobalOpts {
            quiet: true,
            verbose: 2,
        };
        assert_eq!(opts.verbosity_level(), 0);
    }

    #[test]
    fn test_resolve_root_precedence() {
        let config = Config {
            root: Some("configured".to_string()),
            ..Default::default()
        };

        assert_eq!(
            resolve_root(Some(PathBuf::from("arg")), &config),
            PathBuf::from("arg")
        );
        assert_eq!(resolve_root(None, &config), PathBuf::from("configured"));
        assert_eq!(resolve_root(None, &Config::default()), PathBuf::from("."));
    }
}

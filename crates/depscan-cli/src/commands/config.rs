use crate::common::load_config;
use crate::errors::CliError;
use crate::logger;
use crate::GlobalOpts;
use clap::Subcommand;
use colored::Colorize;
use depscan_config::{Config, CONFIG_KEYS};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the path of the configuration file
    Path,
}

fn show(config: &Config, opts: &GlobalOpts) {
    println!("{}", "Configuration:".bold().green());
    if config.is_empty() {
        if opts.verbosity_level() > 0 {
            println!("  {}", "(empty)".yellow());
        }
        return;
    }

    for (key, value) in config.values_iter() {
        println!("  {}: {}", key.cyan(), value);
    }

    if let Some(ref sdk) = config.sdk {
        println!("  {}", "sdk:".cyan());
        if let Some(ref entry) = sdk.register_entry_point {
            println!("    register-entry-point: {}", entry);
        }
        if let Some(ref param) = sdk.register_param_type {
            println!("    register-param-type: {}", param);
        }
        if let Some(ref entries) = sdk.discovery_entry_points {
            println!("    discovery-entry-points: {}", entries.join(","));
        }
        if let Some(ref params) = sdk.discovery_param_types {
            println!("    discovery-param-types: {}", params.join(","));
        }
    }
}

pub fn handle_config(action: Option<ConfigAction>, opts: GlobalOpts) -> Result<(), CliError> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = load_config()?;
            show(&config, &opts);
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_config()?;
            config.set(&key, value.clone()).map_err(|e| {
                CliError::Config(format!(
                    "{}. Supported keys: {}",
                    e,
                    CONFIG_KEYS.join(", ")
                ))
            })?;
            config
                .save()
                .map_err(|e| CliError::Config(format!("Failed to save config: {}", e)))?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            let config_path = Config::path();
            logger::debug(&format!("Reading config from: {}", config_path.display()));
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

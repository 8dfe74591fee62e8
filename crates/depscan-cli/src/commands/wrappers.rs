use crate::commands::analyze::{run_analysis, AnalyzeCommand, AnalyzeSettings};
use crate::common::load_config;
use crate::errors::CliError;
use crate::logger;
use crate::GlobalOpts;
use clap::Args;
use colored::Colorize;
use depscan_ast::{files_containing_calls, ApplicationWrappers, DiscoveryWrapper, RegistrationWrapper, WrapperOrigin};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct WrappersCommand {
    /// Directory to scan for deployment descriptors and Go sources
    pub root: Option<PathBuf>,

    /// Print the wrappers as JSON
    #[arg(long)]
    pub json: bool,
}

/// Wrappers of one application plus the files the pre-filter selected
#[derive(Debug, Serialize)]
struct WrapperListing<'a> {
    #[serde(flatten)]
    wrappers: &'a ApplicationWrappers,
    /// SDK entry point -> files containing `name(`
    sdk_calls: BTreeMap<String, Vec<PathBuf>>,
}

fn origin_label(origin: WrapperOrigin) -> &'static str {
    match origin {
        WrapperOrigin::Function => "func",
        WrapperOrigin::Method => "method",
    }
}

fn print_registration(wrapper: &RegistrationWrapper) {
    println!(
        "    {} {} {} name={} ip={} port={}",
        "register".green(),
        origin_label(wrapper.origin),
        wrapper.function.bold(),
        wrapper.service_name,
        wrapper.ip,
        wrapper.port
    );
}

fn print_discovery(wrapper: &DiscoveryWrapper) {
    println!(
        "    {} {} {} via {} name={}",
        "discover".blue(),
        origin_label(wrapper.origin),
        wrapper.function.bold(),
        wrapper.entry_point,
        wrapper.service_name
    );
}

pub fn handle_wrappers(cmd: WrappersCommand, opts: GlobalOpts) -> Result<(), CliError> {
    let config = load_config()?;
    let settings = AnalyzeSettings::resolve(
        &AnalyzeCommand {
            root: cmd.root.clone(),
            ..Default::default()
        },
        &config,
    );

    let (scan, report) = run_analysis(&settings)?;
    let entry_points = settings.options.sdk.all_entry_points();

    let mut listings = Vec::with_capacity(report.wrappers.len());
    for wrappers in &report.wrappers {
        let sdk_calls = match scan.applications.get(&wrappers.service_name) {
            Some(app) => files_containing_calls(&app.source_directory, &entry_points)?,
            None => BTreeMap::new(),
        };
        listings.push(WrapperListing { wrappers, sdk_calls });
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if listings.is_empty() {
        logger::warn(&format!(
            "No deployment descriptors found under {}",
            settings.root.display()
        ));
        return Ok(());
    }

    for listing in &listings {
        println!("{}", listing.wrappers.service_name.bold().cyan());
        if listing.wrappers.registration.is_empty() && listing.wrappers.discovery.is_empty() {
            println!("    {}", "(no wrappers)".yellow());
        }
        for wrapper in &listing.wrappers.registration {
            print_registration(wrapper);
        }
        for wrapper in &listing.wrappers.discovery {
            print_discovery(wrapper);
        }
        if opts.verbosity_level() > 0 {
            for (entry_point, files) in &listing.sdk_calls {
                for file in files {
                    println!("    {} {} in {}", "call".dimmed(), entry_point, file.display());
                }
            }
        }
    }

    Ok(())
}

use crate::common::{load_config, resolve_root};
use crate::errors::CliError;
use crate::logger;
use crate::GlobalOpts;
use clap::Args;
use colored::Colorize;
use depscan_ast::{AnalysisOptions, AnalysisReport, DependencyDiscovery, SdkProfile};
use depscan_config::Config;
use depscan_manifest::manifest_writer::to_json_bytes;
use depscan_manifest::{discover_applications, write_manifest, DescriptorScan, UnresolvedDiscovery};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeCommand {
    /// Directory to scan for deployment descriptors and Go sources
    pub root: Option<PathBuf>,

    /// Prefix prepended to `<service>.json` (default: output/)
    #[arg(short, long)]
    pub output_prefix: Option<String>,

    /// Abort on the first Go file that does not parse
    #[arg(long)]
    pub strict: bool,

    /// Leave out discovery targets no application registers
    #[arg(long)]
    pub omit_unresolved: bool,

    /// Print the manifests instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Effective settings after merging flags over the configuration file
#[derive(Debug, Clone)]
pub struct AnalyzeSettings {
    pub root: PathBuf,
    pub output_prefix: String,
    pub descriptor_extensions: Vec<String>,
    pub options: AnalysisOptions,
}

impl AnalyzeSettings {
    pub fn resolve(cmd: &AnalyzeCommand, config: &Config) -> Self {
        let unresolved = if cmd.omit_unresolved || config.omit_unresolved() {
            UnresolvedDiscovery::Omit
        } else {
            UnresolvedDiscovery::EmitEmpty
        };

        AnalyzeSettings {
            root: resolve_root(cmd.root.clone(), config),
            output_prefix: cmd
                .output_prefix
                .clone()
                .unwrap_or_else(|| config.get_output_prefix()),
            descriptor_extensions: config.get_descriptor_extensions(),
            options: AnalysisOptions {
                sdk: SdkProfile::from_config(config.sdk.as_ref()),
                strict_parse: cmd.strict || config.strict_parse(),
                unresolved,
            },
        }
    }
}

/// Load descriptors below the root and run the analysis over them
pub fn run_analysis(settings: &AnalyzeSettings) -> Result<(DescriptorScan, AnalysisReport), CliError> {
    logger::debug(&format!("Scanning {} for descriptors", settings.root.display()));
    let scan = discover_applications(&settings.root, &settings.descriptor_extensions)?;

    for skipped in &scan.skipped {
        logger::debug(&format!(
            "Skipped descriptor {}: {}",
            skipped.path.display(),
            skipped.reason
        ));
    }
    for replaced in &scan.overridden {
        logger::warn(&format!(
            "Descriptor {} for '{}' was replaced by a later one",
            replaced.descriptor_path.display(),
            replaced.service_name
        ));
    }

    let discovery = DependencyDiscovery::new(settings.options.clone());
    let report = discovery.analyze(&scan.applications)?;

    for diagnostic in &report.diagnostics {
        logger::warn(&diagnostic.to_string());
    }

    Ok((scan, report))
}

/// Write every manifest, returning how many could not be written
///
/// A failed write is logged and does not stop the remaining applications.
fn write_manifests(report: &AnalysisReport, output_prefix: &str) -> usize {
    let mut failed = 0;
    for manifest in &report.manifests {
        match write_manifest(manifest, output_prefix) {
            Ok(path) => logger::info(&format!(
                "  {} {} ({} request(s))",
                manifest.service.cyan(),
                path.display(),
                manifest.requests.len()
            )),
            Err(e) => {
                failed += 1;
                logger::error(&format!(
                    "Failed to write manifest for '{}': {}",
                    manifest.service, e
                ));
            }
        }
    }
    failed
}

pub fn handle_analyze(cmd: AnalyzeCommand, _opts: GlobalOpts) -> Result<(), CliError> {
    let config = load_config()?;
    let settings = AnalyzeSettings::resolve(&cmd, &config);

    logger::spinner_start(&format!("Analyzing {}", settings.root.display()));
    let (scan, report) = match run_analysis(&settings) {
        Ok(result) => result,
        Err(e) => {
            logger::spinner_error("Analysis failed");
            return Err(e);
        }
    };
    logger::spinner_stop();

    if scan.applications.is_empty() {
        logger::warn(&format!(
            "No deployment descriptors found under {}",
            settings.root.display()
        ));
        return Ok(());
    }

    if cmd.dry_run {
        for manifest in &report.manifests {
            let bytes = to_json_bytes(manifest)?;
            print!("{}", String::from_utf8_lossy(&bytes));
        }
        return Ok(());
    }

    let failed = write_manifests(&report, &settings.output_prefix);
    if failed > 0 {
        return Err(CliError::ManifestWrites {
            failed,
            total: report.manifests.len(),
        });
    }

    logger::success(&format!(
        "{} manifest(s) from {} file(s); {} service(s) registered, {} diagnostic(s)",
        report.manifests.len(),
        report.files_scanned,
        report.directory.len(),
        report.diagnostics.len()
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() -> Result<(), String> {
        let mut config = Config::default();
        config.set("output-prefix", "from-config/".to_string())?;
        config.set("unresolved-discovery", "emit-empty".to_string())?;

        let cmd = AnalyzeCommand {
            root: Some(PathBuf::from("services")),
            output_prefix: Some("from-flag/".to_string()),
            strict: true,
            omit_unresolved: true,
            dry_run: false,
        };
        let settings = AnalyzeSettings::resolve(&cmd, &config);

        assert_eq!(settings.root, PathBuf::from("services"));
        assert_eq!(settings.output_prefix, "from-flag/");
        assert!(settings.options.strict_parse);
        assert_eq!(settings.options.unresolved, UnresolvedDiscovery::Omit);
        Ok(())
    }

    #[test]
    fn test_config_defaults_apply() {
        let settings = AnalyzeSettings::resolve(&AnalyzeCommand::default(), &Config::default());

        assert_eq!(settings.root, PathBuf::from("."));
        assert_eq!(settings.output_prefix, "output/");
        assert_eq!(settings.descriptor_extensions, vec!["yaml", "yml"]);
        assert!(!settings.options.strict_parse);
        assert_eq!(settings.options.unresolved, UnresolvedDiscovery::EmitEmpty);
        assert_eq!(settings.options.sdk, SdkProfile::default());
    }
}

//! Static discovery of service dependencies in Go sources using ast-grep
//!
//! The pipeline runs in four phases over the applications found by the
//! descriptor loader:
//! 1. List and parse every `.go` file of each application (once per run)
//! 2. Infer registration wrappers and resolve their call sites for all
//!    applications, filling the global service directory
//! 3. Infer discovery wrappers and resolve their call sites
//! 4. Join discovered names with the directory into one manifest per application,
//!    one request per discovery call site
//!
//! Phase 2 completes for every application before phase 3 starts. Within a
//! phase applications are processed in parallel and merged in name order.
pub mod diagnostics;
pub mod invocations;
pub mod provenance;
pub mod sdk;
pub mod source_files;
pub mod syntax;
pub mod wrappers;

use anyhow::Result;
use depscan_logger as logger;
use depscan_manifest::{
    ApplicationDescriptor, ManifestAssembler, ServiceDirectory, TcpManifest, UnresolvedDiscovery,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub use diagnostics::{Diagnostic, DiagnosticKind, SourceError};
pub use invocations::{resolve_discovery_calls, resolve_registration_calls, ResolvedDiscovery, ResolvedRegistration};
pub use sdk::SdkProfile;
pub use source_files::{files_containing_calls, list_source_files};
pub use syntax::ParsedSource;
pub use wrappers::{
    find_discovery_wrappers, find_registration_wrappers, DiscoveryWrapper, ParamRef, RegistrationWrapper,
    WrapperOrigin,
};

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub sdk: SdkProfile,
    /// Abort on the first Go parse error instead of skipping the file
    pub strict_parse: bool,
    pub unresolved: UnresolvedDiscovery,
}

/// The parsed sources of one application
#[derive(Debug)]
pub struct ApplicationSources {
    pub application: ApplicationDescriptor,
    pub sources: Vec<ParsedSource>,
    /// Files mentioning an SDK entry point; only these are searched for wrappers
    pub candidates: Vec<usize>,
    pub files_listed: usize,
}

impl ApplicationSources {
    fn candidate_sources(&self) -> impl Iterator<Item = &ParsedSource> {
        self.candidates.iter().filter_map(|&i| self.sources.get(i))
    }
}

/// Wrappers inferred for one application, de-duplicated
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplicationWrappers {
    pub service_name: String,
    pub registration: Vec<RegistrationWrapper>,
    pub discovery: Vec<DiscoveryWrapper>,
}

/// Everything one run produced
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// One manifest per application, ordered by service name
    pub manifests: Vec<TcpManifest>,
    pub directory: ServiceDirectory,
    pub diagnostics: Vec<Diagnostic>,
    pub files_scanned: usize,
    pub wrappers: Vec<ApplicationWrappers>,
}

struct RegistrationOutcome {
    wrappers: Vec<RegistrationWrapper>,
    registrations: Vec<ResolvedRegistration>,
    diagnostics: Vec<Diagnostic>,
}

struct DiscoveryOutcome {
    wrappers: Vec<DiscoveryWrapper>,
    discovered: Vec<ResolvedDiscovery>,
    diagnostics: Vec<Diagnostic>,
}

/// Static dependency discovery orchestrator
pub struct DependencyDiscovery {
    options: AnalysisOptions,
}

impl DependencyDiscovery {
    pub fn new(options: AnalysisOptions) -> Self {
        DependencyDiscovery { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Run every phase and assemble the manifests
    ///
    /// Fails only when strict parsing is enabled and a source file does not
    /// parse; every other problem is reported as a diagnostic.
    pub fn analyze(&self, applications: &BTreeMap<String, ApplicationDescriptor>) -> Result<AnalysisReport> {
        let start_time = std::time::Instant::now();
        let mut report = AnalysisReport::default();

        let mut apps: Vec<ApplicationSources> = Vec::with_capacity(applications.len());
        for (sources, diagnostics) in self.load_applications(applications)? {
            report.files_scanned += sources.files_listed;
            report.diagnostics.extend(diagnostics);
            apps.push(sources);
        }
        logger::debug(&format!(
            "Phase 1 complete: parsed {} file(s) across {} application(s)",
            report.files_scanned,
            apps.len()
        ));

        let (apps, registration): (Vec<_>, Vec<_>) = apps
            .into_par_iter()
            .map(|app| {
                let outcome = self.register_application(&app);
                (app, outcome)
            })
            .unzip();

        let mut wrappers: Vec<ApplicationWrappers> = Vec::with_capacity(apps.len());
        for (app, outcome) in apps.iter().zip(registration) {
            for registered in outcome.registrations {
                if let Some(previous) = report
                    .directory
                    .register(registered.service_name.clone(), registered.info.clone())
                {
                    if previous.application != registered.info.application {
                        warn!(
                            "Service '{}' registered by both '{}' and '{}'; keeping '{}'",
                            registered.service_name,
                            previous.application,
                            registered.info.application,
                            registered.info.application
                        );
                    }
                }
            }
            report.diagnostics.extend(outcome.diagnostics);
            wrappers.push(ApplicationWrappers {
                service_name: app.application.service_name.clone(),
                registration: outcome.wrappers,
                discovery: Vec::new(),
            });
        }
        logger::debug(&format!(
            "Phase 2 complete: {} service(s) registered",
            report.directory.len()
        ));

        let discovery: Vec<(ApplicationDescriptor, DiscoveryOutcome)> = apps
            .into_par_iter()
            .map(|app| {
                let outcome = self.discover_application(&app);
                (app.application, outcome)
            })
            .collect();

        let assembler = ManifestAssembler::new(&report.directory, self.options.unresolved);
        let mut manifests = Vec::with_capacity(discovery.len());
        for ((application, outcome), app_wrappers) in discovery.into_iter().zip(wrappers.iter_mut()) {
            let names: Vec<String> = outcome
                .discovered
                .into_iter()
                .map(|found| found.service_name)
                .collect();
            manifests.push(assembler.assemble(&application, &names));
            report.diagnostics.extend(outcome.diagnostics);
            app_wrappers.discovery = outcome.wrappers;
        }
        report.manifests = manifests;
        report.wrappers = wrappers;

        logger::debug(&format!(
            "Analysis completed in {:.2}ms: {} manifest(s), {} diagnostic(s)",
            start_time.elapsed().as_secs_f64() * 1000.0,
            report.manifests.len(),
            report.diagnostics.len()
        ));

        Ok(report)
    }

    /// List and parse the sources of every application
    pub fn load_applications(
        &self,
        applications: &BTreeMap<String, ApplicationDescriptor>,
    ) -> Result<Vec<(ApplicationSources, Vec<Diagnostic>)>> {
        let descriptors: Vec<ApplicationDescriptor> = applications.values().cloned().collect();

        descriptors
            .into_par_iter()
            .map(|application| self.load_application(application))
            .collect()
    }

    fn load_application(
        &self,
        application: ApplicationDescriptor,
    ) -> Result<(ApplicationSources, Vec<Diagnostic>)> {
        let mut diagnostics = Vec::new();
        let entry_points = self.options.sdk.all_entry_points();

        let files = match list_source_files(&application.source_directory) {
            Ok(files) => files,
            Err(err) => {
                warn!("{:#}", err);
                diagnostics.push(Diagnostic::unreadable(
                    application.source_directory.clone(),
                    err.root_cause().to_string(),
                ));
                Vec::new()
            }
        };

        let mut sources = Vec::with_capacity(files.len());
        let mut candidates = Vec::new();
        for path in &files {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(source) => {
                    let err = SourceError::Io {
                        path: path.clone(),
                        source,
                    };
                    warn!("{}", err);
                    diagnostics.push(Diagnostic::from(&err));
                    continue;
                }
            };

            let is_candidate = entry_points
                .iter()
                .any(|name| source_files::mentions_call(&content, name));

            match ParsedSource::parse(path.clone(), &content) {
                Ok(parsed) => {
                    if is_candidate {
                        candidates.push(sources.len());
                    }
                    sources.push(parsed);
                }
                Err(err) if self.options.strict_parse => return Err(err.into()),
                Err(err) => {
                    warn!("{}; skipping file", err);
                    diagnostics.push(Diagnostic::from(&err));
                }
            }
        }

        debug!(
            "Application '{}': {} source file(s), {} candidate(s)",
            application.service_name,
            sources.len(),
            candidates.len()
        );

        Ok((
            ApplicationSources {
                application,
                sources,
                candidates,
                files_listed: files.len(),
            },
            diagnostics,
        ))
    }

    /// Registration wrappers of one application, identical ones merged
    pub fn registration_wrappers(&self, app: &ApplicationSources) -> Vec<RegistrationWrapper> {
        let mut wrappers: Vec<RegistrationWrapper> = Vec::new();
        for source in app.candidate_sources() {
            for wrapper in find_registration_wrappers(source, &self.options.sdk) {
                if !wrappers.contains(&wrapper) {
                    wrappers.push(wrapper);
                }
            }
        }
        wrappers
    }

    /// Discovery wrappers of one application
    ///
    /// Wrappers differing only in the SDK entry point they call are merged so
    /// that each call site is counted once.
    pub fn discovery_wrappers(&self, app: &ApplicationSources) -> Vec<DiscoveryWrapper> {
        let mut wrappers: Vec<DiscoveryWrapper> = Vec::new();
        for source in app.candidate_sources() {
            for wrapper in find_discovery_wrappers(source, &self.options.sdk) {
                let duplicate = wrappers.iter().any(|w| {
                    w.function == wrapper.function
                        && w.origin == wrapper.origin
                        && w.service_name == wrapper.service_name
                });
                if !duplicate {
                    wrappers.push(wrapper);
                }
            }
        }
        wrappers
    }

    fn register_application(&self, app: &ApplicationSources) -> RegistrationOutcome {
        let wrappers = self.registration_wrappers(app);
        let mut registrations = Vec::new();
        let mut diagnostics = Vec::new();

        for wrapper in &wrappers {
            for source in &app.sources {
                let resolution =
                    resolve_registration_calls(source, wrapper, &app.application.service_name);
                registrations.extend(resolution.resolved);
                diagnostics.extend(resolution.diagnostics);
            }
        }

        RegistrationOutcome {
            wrappers,
            registrations,
            diagnostics,
        }
    }

    fn discover_application(&self, app: &ApplicationSources) -> DiscoveryOutcome {
        let wrappers = self.discovery_wrappers(app);
        let mut discovered = Vec::new();
        let mut diagnostics = Vec::new();

        for wrapper in &wrappers {
            for source in &app.sources {
                let resolution = resolve_discovery_calls(source, wrapper, &app.application.service_name);
                discovered.extend(resolution.resolved);
                diagnostics.extend(resolution.diagnostics);
            }
        }
        discovered.sort_by(|a, b| (&a.path, a.line).cmp(&(&b.path, b.line)));

        DiscoveryOutcome {
            wrappers,
            discovered,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const LOGIN_NACOS: &str = r#"package main

func registerService(client naming_client.INamingClient, serviceName, ip string, port uint64) error {
	_, err := client.RegisterInstance(vo.RegisterInstanceParam{
		Ip:          ip,
		Port:        port,
		ServiceName: serviceName,
	})
	return err
}
"#;

    const LOGIN_MAIN: &str = r#"package main

func main() {
	registerService(NamingClient, "login-service", "10.0.0.5", 8083)
}
"#;

    const GAME_NACOS: &str = r#"package main

func subscribeLoginService() {
	err := NamingClient.Subscribe(&vo.SubscribeParam{
		ServiceName: "login-service",
	})
	_ = err
}

func lookup(name string) {
	NamingClient.SelectInstances(vo.SelectInstancesParam{ServiceName: name})
}
"#;

    const GAME_MAIN: &str = r#"package main

func main() {
	subscribeLoginService()
	lookup("scoreboard-service")
	lookup(os.Getenv("TARGET") + "-svc")
}
"#;

    fn write(dir: &Path, name: &str, content: &str) {
        if let Err(err) = fs::create_dir_all(dir).and_then(|()| fs::write(dir.join(name), content)) {
            panic!("failed to write fixture {}: {}", name, err);
        }
    }

    fn app(root: &Path, name: &str) -> ApplicationDescriptor {
        ApplicationDescriptor {
            service_name: name.to_string(),
            version: "v1".to_string(),
            source_directory: root.join(name),
            descriptor_path: root.join(name).join("deployment.yaml"),
        }
    }

    fn fixture() -> (TempDir, BTreeMap<String, ApplicationDescriptor>) {
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(err) => panic!("tempdir: {}", err),
        };
        let root = temp_dir.path();
        write(&root.join("login"), "nacos.go", LOGIN_NACOS);
        write(&root.join("login"), "main.go", LOGIN_MAIN);
        write(&root.join("game"), "nacos.go", GAME_NACOS);
        write(&root.join("game"), "main.go", GAME_MAIN);

        let mut applications = BTreeMap::new();
        for name in ["login", "game"] {
            applications.insert(name.to_string(), app(root, name));
        }
        (temp_dir, applications)
    }

    #[test]
    fn test_cross_application_join() -> Result<()> {
        let (_temp_dir, applications) = fixture();
        let report = DependencyDiscovery::new(AnalysisOptions::default()).analyze(&applications)?;

        assert_eq!(report.files_scanned, 4);
        assert_eq!(report.manifests.len(), 2);

        let game = &report.manifests[0];
        assert_eq!(game.service, "game");
        assert_eq!(game.requests.len(), 3);
        assert_eq!(game.requests[0].url, "10.0.0.5");
        assert_eq!(game.requests[0].name, "login");
        assert_eq!(game.requests[0].port, "8083");
        assert!(game.requests[1].is_unresolved());
        assert!(game.requests[2].is_unresolved());

        let login = &report.manifests[1];
        assert_eq!(login.service, "login");
        assert!(login.requests.is_empty());

        assert!(report.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_each_discovery_call_site_yields_a_request() -> Result<()> {
        let (temp_dir, applications) = fixture();
        write(
            &temp_dir.path().join("game"),
            "main.go",
            "package main\n\nfunc main() {\n\tlookup(\"login-service\")\n\tlookup(\"login-service\")\n}\n",
        );

        let report = DependencyDiscovery::new(AnalysisOptions::default()).analyze(&applications)?;

        let game = &report.manifests[0];
        assert_eq!(game.requests.len(), 2);
        assert!(game.requests.iter().all(|r| r.name == "login" && r.port == "8083"));
        Ok(())
    }

    #[test]
    fn test_omit_policy_drops_unregistered_targets() -> Result<()> {
        let (_temp_dir, applications) = fixture();
        let options = AnalysisOptions {
            unresolved: UnresolvedDiscovery::Omit,
            ..Default::default()
        };
        let report = DependencyDiscovery::new(options).analyze(&applications)?;

        assert_eq!(report.manifests[0].requests.len(), 1);
        assert_eq!(report.manifests[0].requests[0].name, "login");
        Ok(())
    }

    #[test]
    fn test_wrappers_are_reported_per_application() -> Result<()> {
        let (_temp_dir, applications) = fixture();
        let report = DependencyDiscovery::new(AnalysisOptions::default()).analyze(&applications)?;

        let game = &report.wrappers[0];
        assert_eq!(game.service_name, "game");
        assert!(game.registration.is_empty());
        assert_eq!(game.discovery.len(), 2);

        let login = &report.wrappers[1];
        assert_eq!(login.registration.len(), 1);
        assert_eq!(login.registration[0].service_name, ParamRef::Parameter(1));
        Ok(())
    }

    #[test]
    fn test_parse_errors_are_skipped_or_fatal() -> Result<()> {
        let (temp_dir, applications) = fixture();
        write(&temp_dir.path().join("login"), "broken.go", "package main\n\nfunc main() {}\n\n)))\n");

        let report = DependencyDiscovery::new(AnalysisOptions::default()).analyze(&applications)?;
        assert_eq!(report.files_scanned, 5);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::ParseError);
        assert_eq!(report.manifests[0].requests[0].port, "8083");

        let strict = AnalysisOptions {
            strict_parse: true,
            ..Default::default()
        };
        let err = match DependencyDiscovery::new(strict).analyze(&applications) {
            Ok(_) => panic!("strict parsing should abort"),
            Err(err) => err,
        };
        assert!(err.downcast_ref::<SourceError>().is_some());
        Ok(())
    }

    #[test]
    fn test_arity_mismatch_does_not_stop_other_call_sites() -> Result<()> {
        let (temp_dir, applications) = fixture();
        write(
            &temp_dir.path().join("login"),
            "extra.go",
            "package main\n\nfunc retry() {\n\tregisterService(NamingClient, \"login-service\")\n}\n",
        );

        let report = DependencyDiscovery::new(AnalysisOptions::default()).analyze(&applications)?;

        assert_eq!(report.diagnostics.len(), 1);
        assert!(matches!(
            report.diagnostics[0].kind,
            DiagnosticKind::ArgumentCountMismatch { .. }
        ));
        assert_eq!(report.manifests[0].requests[0].url, "10.0.0.5");
        Ok(())
    }

    #[test]
    fn test_missing_source_directory_is_a_diagnostic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut applications = BTreeMap::new();
        applications.insert("ghost".to_string(), app(temp_dir.path(), "ghost"));

        let report = DependencyDiscovery::new(AnalysisOptions::default()).analyze(&applications)?;

        assert_eq!(report.manifests.len(), 1);
        assert!(report.manifests[0].requests.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].path, temp_dir.path().join("ghost"));
        match &report.diagnostics[0].kind {
            DiagnosticKind::Unreadable { reason } => {
                assert!(!reason.is_empty());
                assert!(!reason.contains("ghost"));
            }
            other => panic!("expected an unreadable diagnostic, got {:?}", other),
        }
        Ok(())
    }
}

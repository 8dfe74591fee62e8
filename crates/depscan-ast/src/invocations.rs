//! Finds call sites of inferred wrappers and substitutes their arguments

use smallvec::SmallVec;
use std::path::PathBuf;
use tracing::{debug, warn};

use depscan_manifest::ServiceInfo;

use crate::diagnostics::Diagnostic;
use crate::provenance::trace_identifier;
use crate::syntax::{
    call_arguments, literal_value, strip_value, walk_with_scope, Callee, FunctionScope, GoNode,
    ParsedSource,
};
use crate::wrappers::{DiscoveryWrapper, ParamRef, RegistrationWrapper, WrapperOrigin};

/// A call-site argument as far as static analysis can see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Literal(String),
    Opaque,
}

pub type CallArgs = SmallVec<[CallArg; 4]>;

#[derive(Debug, Clone)]
pub struct CallSite {
    pub line: usize,
    pub args: CallArgs,
}

/// A registration call site with every field substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRegistration {
    pub service_name: String,
    pub info: ServiceInfo,
    pub path: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDiscovery {
    pub service_name: String,
    pub entry_point: String,
    pub path: PathBuf,
    pub line: usize,
}

/// Results for the call sites of one wrapper in one file
#[derive(Debug, Clone)]
pub struct Resolution<T> {
    pub resolved: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Default for Resolution<T> {
    fn default() -> Self {
        Resolution {
            resolved: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Whether a callee invokes the wrapper
///
/// Functions match bare calls, and package-qualified calls when exported.
/// Methods match any selector call with the method's name.
fn calls_wrapper(callee: &Callee, function: &str, origin: WrapperOrigin) -> bool {
    match (origin, callee) {
        (WrapperOrigin::Function, Callee::Bare(name)) => name == function,
        (WrapperOrigin::Function, Callee::Selector { field, .. }) => {
            field == function && is_exported(function)
        }
        (WrapperOrigin::Method, Callee::Selector { field, .. }) => field == function,
        (WrapperOrigin::Method, Callee::Bare(_)) => false,
    }
}

fn evaluate_argument(root: &GoNode<'_>, scope: Option<&FunctionScope<'_>>, argument: &GoNode<'_>) -> CallArg {
    let argument = strip_value(argument);
    if let Some(literal) = literal_value(&argument) {
        return CallArg::Literal(literal);
    }

    if argument.kind() == "identifier" {
        let name = argument.text();
        let shadowed = scope.is_some_and(|s| s.param_index(&name).is_some());
        if !shadowed {
            let body = scope.and_then(FunctionScope::body);
            if let Some(literal) = trace_identifier(root, body.as_ref(), &name) {
                return CallArg::Literal(literal);
            }
        }
    }

    CallArg::Opaque
}

/// Every call of `function` in a file, with its evaluated arguments
pub fn wrapper_call_sites(source: &ParsedSource, function: &str, origin: WrapperOrigin) -> Vec<CallSite> {
    let root = source.root();
    let mut sites = Vec::new();

    walk_with_scope(&root, &mut |node, scope| {
        let Some(callee) = Callee::of(node) else {
            return;
        };
        if !calls_wrapper(&callee, function, origin) {
            return;
        }

        let args = call_arguments(node)
            .iter()
            .map(|argument| evaluate_argument(&root, scope, argument))
            .collect();
        sites.push(CallSite {
            line: source.line_of_node(node),
            args,
        });
    });

    sites
}

/// Concrete value of a reference at one call site
///
/// `Err(index)` when the reference points past the supplied arguments.
fn substitute(reference: &ParamRef, args: &[CallArg]) -> Result<String, usize> {
    match reference {
        ParamRef::Literal(value) => Ok(value.clone()),
        ParamRef::Unresolved => Ok(String::new()),
        ParamRef::Parameter(index) => match args.get(*index) {
            Some(CallArg::Literal(value)) => Ok(value.clone()),
            Some(CallArg::Opaque) => Ok(String::new()),
            None => Err(*index),
        },
    }
}

fn substitute_registration(
    wrapper: &RegistrationWrapper,
    args: &[CallArg],
) -> Result<(String, String, String), usize> {
    Ok((
        substitute(&wrapper.service_name, args)?,
        substitute(&wrapper.ip, args)?,
        substitute(&wrapper.port, args)?,
    ))
}

fn mismatch(source: &ParsedSource, site: &CallSite, wrapper: &str, index: usize) -> Diagnostic {
    let diagnostic = Diagnostic::argument_count_mismatch(
        source.path().to_path_buf(),
        site.line,
        wrapper,
        index,
        site.args.len(),
    );
    warn!("{}", diagnostic);
    diagnostic
}

pub fn resolve_registration_calls(
    source: &ParsedSource,
    wrapper: &RegistrationWrapper,
    application: &str,
) -> Resolution<ResolvedRegistration> {
    let mut resolution = Resolution::default();

    for site in wrapper_call_sites(source, &wrapper.function, wrapper.origin) {
        match substitute_registration(wrapper, &site.args) {
            Ok((service_name, ip, port)) => {
                debug!(
                    "{:?}:{}: {} registers '{}' at {}:{}",
                    source.path(),
                    site.line,
                    wrapper.function,
                    service_name,
                    ip,
                    port
                );
                resolution.resolved.push(ResolvedRegistration {
                    service_name,
                    info: ServiceInfo {
                        application: application.to_string(),
                        ip,
                        port,
                    },
                    path: source.path().to_path_buf(),
                    line: site.line,
                });
            }
            Err(index) => {
                let diagnostic = mismatch(source, &site, &wrapper.function, index);
                resolution.diagnostics.push(diagnostic);
            }
        }
    }

    resolution
}

pub fn resolve_discovery_calls(
    source: &ParsedSource,
    wrapper: &DiscoveryWrapper,
    application: &str,
) -> Resolution<ResolvedDiscovery> {
    let mut resolution = Resolution::default();

    for site in wrapper_call_sites(source, &wrapper.function, wrapper.origin) {
        match substitute(&wrapper.service_name, &site.args) {
            Ok(service_name) => {
                debug!(
                    "{:?}:{}: '{}' discovers '{}' via {}",
                    source.path(),
                    site.line,
                    application,
                    service_name,
                    wrapper.entry_point
                );
                resolution.resolved.push(ResolvedDiscovery {
                    service_name,
                    entry_point: wrapper.entry_point.clone(),
                    path: source.path().to_path_buf(),
                    line: site.line,
                });
            }
            Err(index) => {
                let diagnostic = mismatch(source, &site, &wrapper.function, index);
                resolution.diagnostics.push(diagnostic);
            }
        }
    }

    resolution
}

//! Wrapper inference
//!
//! A wrapper is a user function whose body calls a registry SDK primitive with
//! a parameter object literal. For every field the analyser cares about we
//! record where its value comes from: a literal, one of the wrapper's own
//! parameters, or nothing traceable.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::provenance::{assigned_values, trace_identifier};
use crate::sdk::SdkProfile;
use crate::syntax::{
    call_arguments, composite_type_name, keyed_entries, literal_value, strip_address, walk_with_scope,
    Callee, FunctionScope, GoNode, ParsedSource,
};

const SERVICE_NAME_KEY: &str = "ServiceName";
const IP_KEY: &str = "Ip";
const PORT_KEY: &str = "Port";

/// Where a wrapper field's value comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamRef {
    Literal(String),
    /// Zero-based index into the wrapper's parameter list
    Parameter(usize),
    Unresolved,
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamRef::Literal(value) => write!(f, "{:?}", value),
            ParamRef::Parameter(index) => write!(f, "${}", index),
            ParamRef::Unresolved => write!(f, "?"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperOrigin {
    /// A plain `func name(...)`
    Function,
    /// A method `func (r T) name(...)`; receivers are not parameters
    Method,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RegistrationWrapper {
    pub function: String,
    pub origin: WrapperOrigin,
    pub service_name: ParamRef,
    pub ip: ParamRef,
    pub port: ParamRef,
}

impl RegistrationWrapper {
    pub fn refs(&self) -> [&ParamRef; 3] {
        [&self.service_name, &self.ip, &self.port]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DiscoveryWrapper {
    pub function: String,
    pub origin: WrapperOrigin,
    pub entry_point: String,
    pub service_name: ParamRef,
}

/// Resolve one parameter-object field value inside its enclosing function
fn resolve_field(root: &GoNode<'_>, scope: &FunctionScope<'_>, value: &GoNode<'_>) -> ParamRef {
    if let Some(literal) = literal_value(value) {
        return ParamRef::Literal(literal);
    }

    if value.kind() != "identifier" {
        return ParamRef::Unresolved;
    }

    let name = value.text();
    if let Some(index) = scope.param_index(&name) {
        return ParamRef::Parameter(index);
    }

    match trace_identifier(root, scope.body().as_ref(), &name) {
        Some(literal) => ParamRef::Literal(literal),
        None => ParamRef::Unresolved,
    }
}

/// The parameter object passed to an SDK call, when it is a composite literal
/// of an accepted type, either inline or through a local variable
fn parameter_object<'r>(
    call: &GoNode<'r>,
    scope: &FunctionScope<'r>,
    is_param_type: impl Fn(&str) -> bool,
) -> Option<GoNode<'r>> {
    let is_param_object =
        |node: &GoNode<'r>| composite_type_name(node).is_some_and(|ty| is_param_type(&ty));

    for argument in call_arguments(call) {
        let argument = strip_address(&argument);
        if is_param_object(&argument) {
            return Some(argument);
        }

        if argument.kind() == "identifier" {
            let body = scope.body()?;
            let assigned = assigned_values(&body, &argument.text())
                .into_iter()
                .map(|value| strip_address(&value))
                .filter(|value| is_param_object(value))
                .last();
            if assigned.is_some() {
                return assigned;
            }
        }
    }

    None
}

fn origin_of(scope: &FunctionScope<'_>) -> WrapperOrigin {
    if scope.is_method {
        WrapperOrigin::Method
    } else {
        WrapperOrigin::Function
    }
}

pub fn find_registration_wrappers(source: &ParsedSource, sdk: &SdkProfile) -> Vec<RegistrationWrapper> {
    let root = source.root();
    let mut wrappers = Vec::new();

    walk_with_scope(&root, &mut |node, scope| {
        let Some(callee) = Callee::of(node) else {
            return;
        };
        if callee.selected_field() != Some(sdk.register_entry_point.as_str()) {
            return;
        }
        let Some(scope) = scope else {
            debug!(
                "{:?}:{}: {} outside any function ignored",
                source.path(),
                source.line_of_node(node),
                sdk.register_entry_point
            );
            return;
        };
        let Some(object) = parameter_object(node, scope, |ty| ty == sdk.register_param_type) else {
            debug!(
                "{:?}:{}: {} without a {} literal",
                source.path(),
                source.line_of_node(node),
                sdk.register_entry_point,
                sdk.register_param_type
            );
            return;
        };

        let mut wrapper = RegistrationWrapper {
            function: scope.name.clone(),
            origin: origin_of(scope),
            service_name: ParamRef::Unresolved,
            ip: ParamRef::Unresolved,
            port: ParamRef::Unresolved,
        };
        for (key, value) in keyed_entries(&object) {
            let slot = match key.as_str() {
                SERVICE_NAME_KEY => &mut wrapper.service_name,
                IP_KEY => &mut wrapper.ip,
                PORT_KEY => &mut wrapper.port,
                _ => continue,
            };
            *slot = resolve_field(&root, scope, &value);
        }

        debug!(
            "Registration wrapper '{}' in {:?}: name={} ip={} port={}",
            wrapper.function,
            source.path(),
            wrapper.service_name,
            wrapper.ip,
            wrapper.port
        );
        wrappers.push(wrapper);
    });

    wrappers
}

pub fn find_discovery_wrappers(source: &ParsedSource, sdk: &SdkProfile) -> Vec<DiscoveryWrapper> {
    let root = source.root();
    let mut wrappers = Vec::new();

    walk_with_scope(&root, &mut |node, scope| {
        let Some(entry_point) = Callee::of(node)
            .and_then(|callee| callee.selected_field().map(str::to_string))
            .filter(|field| sdk.is_discovery_entry_point(field))
        else {
            return;
        };
        let Some(scope) = scope else {
            debug!(
                "{:?}:{}: {} outside any function ignored",
                source.path(),
                source.line_of_node(node),
                entry_point
            );
            return;
        };
        let Some(object) = parameter_object(node, scope, |ty| sdk.is_discovery_param_type(ty)) else {
            return;
        };

        let service_name = keyed_entries(&object)
            .into_iter()
            .filter(|(key, _)| key == SERVICE_NAME_KEY)
            .map(|(_, value)| resolve_field(&root, scope, &value))
            .last()
            .unwrap_or(ParamRef::Unresolved);

        debug!(
            "Discovery wrapper '{}' ({}) in {:?}: name={}",
            scope.name,
            entry_point,
            source.path(),
            service_name
        );
        wrappers.push(DiscoveryWrapper {
            function: scope.name.clone(),
            origin: origin_of(scope),
            entry_point,
            service_name,
        });
    });

    wrappers
}

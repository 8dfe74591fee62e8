//! Tracing identifiers back to the literal they were assigned
//!
//! Only straight-line assignments are followed: `x := "a"`, `x = "a"`,
//! `var x = "a"` and `const x = "a"`, plus the same forms where the right-hand
//! side is a call whose first argument is a literal (`x := getenv("PORT")`
//! yields `PORT`). The last such assignment in source order wins.

use crate::syntax::{call_arguments, literal_value, named_children, strip_value, walk_with_scope, GoNode};

/// Every expression assigned to `name` below `scope`, in source order
pub fn assigned_values<'r>(scope: &GoNode<'r>, name: &str) -> Vec<GoNode<'r>> {
    let mut values = Vec::new();

    walk_with_scope(scope, &mut |node, _| {
        let (targets, sources) = match &*node.kind() {
            "short_var_declaration" => (node.field("left"), node.field("right")),
            "assignment_statement" => {
                let plain = node
                    .field("operator")
                    .map_or(true, |op| op.text() == "=");
                if !plain {
                    return;
                }
                (node.field("left"), node.field("right"))
            }
            "var_spec" | "const_spec" => (Some(node.clone()), node.field("value")),
            _ => return,
        };

        let (Some(targets), Some(sources)) = (targets, sources) else {
            return;
        };

        let targets: Vec<_> = named_children(&targets)
            .into_iter()
            .filter(|t| t.kind() == "identifier")
            .collect();
        let sources = named_children(&sources);

        let Some(index) = targets.iter().position(|t| t.text() == name) else {
            return;
        };

        let value = if sources.len() == targets.len() {
            sources.get(index)
        } else if sources.len() == 1 {
            sources.first()
        } else {
            None
        };

        if let Some(value) = value {
            values.push(value.clone());
        }
    });

    values
}

/// Literal carried by an assigned expression: the literal itself, or the
/// first argument of a call when that argument is a literal
pub fn literal_of_expression(value: &GoNode<'_>) -> Option<String> {
    let value = strip_value(value);
    if let Some(literal) = literal_value(&value) {
        return Some(literal);
    }

    if value.kind() == "call_expression" {
        let first = call_arguments(&value).into_iter().next()?;
        return literal_value(&strip_value(&first));
    }

    None
}

/// Last literal assigned to `name` inside a function body
pub fn local_literal(body: &GoNode<'_>, name: &str) -> Option<String> {
    assigned_values(body, name)
        .iter()
        .filter_map(literal_of_expression)
        .last()
}

/// Literal value of a package-level `const` or `var` named `name`
pub fn package_literal(root: &GoNode<'_>, name: &str) -> Option<String> {
    named_children(root)
        .into_iter()
        .filter(|decl| matches!(&*decl.kind(), "const_declaration" | "var_declaration"))
        .flat_map(|decl| assigned_values(&decl, name))
        .filter_map(|value| literal_of_expression(&value))
        .last()
}

/// Local literal first, then package level
pub fn trace_identifier(root: &GoNode<'_>, body: Option<&GoNode<'_>>, name: &str) -> Option<String> {
    body.and_then(|body| local_literal(body, name))
        .or_else(|| package_literal(root, name))
}

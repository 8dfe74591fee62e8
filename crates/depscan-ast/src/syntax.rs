//! Go syntax trees and the scoped traversal used by wrapper inference
//!
//! Files are parsed with ast-grep's tree-sitter Go grammar. Every other module
//! works on the nodes handed out here; node kinds are the tree-sitter-go ones
//! (`call_expression`, `composite_literal`, `keyed_element`, ...).

use ast_grep_core::source::StrDoc;
use ast_grep_core::{AstGrep, Node};
use ast_grep_language::Go;
use std::path::{Path, PathBuf};

use crate::diagnostics::SourceError;

pub type GoDoc = StrDoc<Go>;
pub type GoNode<'r> = Node<'r, GoDoc>;

const LITERAL_KINDS: &[&str] = &[
    "interpreted_string_literal",
    "raw_string_literal",
    "int_literal",
    "float_literal",
    "imaginary_literal",
    "rune_literal",
];

/// Predeclared types whose single-argument conversions are transparent
const CONVERSION_TYPES: &[&str] = &[
    "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
    "uint64", "uintptr", "float32", "float64", "byte", "rune",
];

/// A parsed Go source file
pub struct ParsedSource {
    path: PathBuf,
    grep: AstGrep<GoDoc>,
    line_starts: Vec<usize>,
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource").field("path", &self.path).finish()
    }
}

impl ParsedSource {
    /// Parse `content`, failing when the tree contains a syntax error or a
    /// token inserted by error recovery
    pub fn parse(path: PathBuf, content: &str) -> Result<Self, SourceError> {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        let parsed = ParsedSource {
            path,
            grep: AstGrep::new(content, Go),
            line_starts,
        };

        let error_line = first_error(&parsed.root(), true).map(|node| parsed.line_of_node(&node));
        if let Some(line) = error_line {
            return Err(SourceError::Parse {
                path: parsed.path,
                line,
            });
        }

        Ok(parsed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> GoNode<'_> {
        self.grep.root()
    }

    /// 1-based line containing byte `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    pub fn line_of_node(&self, node: &GoNode<'_>) -> usize {
        self.line_of(node.range().start)
    }
}

/// First `ERROR` node, or the first token the parser had to invent
///
/// Recovered tokens (a missing `}` or `)`) are zero-width leaves; valid Go
/// produces none below the root apart from empty string contents.
fn first_error<'r>(node: &GoNode<'r>, is_root: bool) -> Option<GoNode<'r>> {
    if node.kind() == "ERROR" {
        return Some(node.clone());
    }
    let mut children = node.children().peekable();
    if children.peek().is_none() {
        let recovered = !is_root && node.range().is_empty() && !node.kind().ends_with("_content");
        return recovered.then(|| node.clone());
    }
    children.find_map(|child| first_error(&child, false))
}

/// The innermost function or method declaration enclosing a node
#[derive(Clone)]
pub struct FunctionScope<'r> {
    pub name: String,
    /// Parameter names by position; receivers are not counted
    pub params: Vec<String>,
    pub is_method: bool,
    pub node: GoNode<'r>,
}

impl<'r> FunctionScope<'r> {
    /// Build a scope from a `function_declaration` or `method_declaration`
    pub fn from_declaration(node: &GoNode<'r>) -> Option<Self> {
        let is_method = match &*node.kind() {
            "function_declaration" => false,
            "method_declaration" => true,
            _ => return None,
        };

        let name = node.field("name")?.text().to_string();
        let params = node
            .field("parameters")
            .map(|list| parameter_names(&list))
            .unwrap_or_default();

        Some(FunctionScope {
            name,
            params,
            is_method,
            node: node.clone(),
        })
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }

    pub fn body(&self) -> Option<GoNode<'r>> {
        self.node.field("body")
    }
}

/// Names in a `parameter_list`, one entry per position
///
/// `a, b string, c int` yields `[a, b, c]`. An unnamed parameter still takes
/// a position and is recorded as `_`.
fn parameter_names(list: &GoNode<'_>) -> Vec<String> {
    let mut names = Vec::new();
    for decl in named_children(list) {
        if !matches!(
            &*decl.kind(),
            "parameter_declaration" | "variadic_parameter_declaration"
        ) {
            continue;
        }

        let before = names.len();
        names.extend(
            decl.children()
                .filter(|c| c.kind() == "identifier")
                .map(|c| c.text().to_string()),
        );
        if names.len() == before {
            names.push("_".to_string());
        }
    }
    names
}

/// Depth-first pre-order traversal tracking the enclosing declaration
///
/// A declaration node itself is visited with its outer scope; its
/// descendants see the declaration's scope. Function literals do not open a
/// scope of their own.
pub fn walk_with_scope<'r, F>(root: &GoNode<'r>, visitor: &mut F)
where
    F: FnMut(&GoNode<'r>, Option<&FunctionScope<'r>>),
{
    walk(root, None, visitor);
}

fn walk<'r, F>(node: &GoNode<'r>, scope: Option<&FunctionScope<'r>>, visitor: &mut F)
where
    F: FnMut(&GoNode<'r>, Option<&FunctionScope<'r>>),
{
    visitor(node, scope);

    match FunctionScope::from_declaration(node) {
        Some(inner) => {
            for child in node.children() {
                walk(&child, Some(&inner), visitor);
            }
        }
        None => {
            for child in node.children() {
                walk(&child, scope, visitor);
            }
        }
    }
}

/// Named children, skipping comments
pub fn named_children<'r>(node: &GoNode<'r>) -> Vec<GoNode<'r>> {
    node.children()
        .filter(|c| c.is_named() && c.kind() != "comment")
        .collect()
}

pub fn is_literal(node: &GoNode<'_>) -> bool {
    LITERAL_KINDS.iter().any(|kind| *kind == node.kind())
}

/// Strip one pair of matching quotes from a string or rune literal
pub fn unquote(text: &str) -> String {
    for quote in ['"', '`', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].to_string();
        }
    }
    text.to_string()
}

/// Value of a literal token, unquoted; numbers are kept as written
pub fn literal_value(node: &GoNode<'_>) -> Option<String> {
    is_literal(node).then(|| unquote(&node.text()))
}

/// Peel parentheses, `literal_element` wrappers and conversions like `uint64(x)`
pub fn strip_value<'r>(node: &GoNode<'r>) -> GoNode<'r> {
    let mut current = node.clone();
    loop {
        let next = match &*current.kind() {
            "parenthesized_expression" | "literal_element" => single_named_child(&current),
            "type_conversion_expression" => current.field("operand"),
            "call_expression" => conversion_operand(&current),
            _ => None,
        };
        match next {
            Some(inner) => current = inner,
            None => return current,
        }
    }
}

fn single_named_child<'r>(node: &GoNode<'r>) -> Option<GoNode<'r>> {
    let children = named_children(node);
    match children.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn conversion_operand<'r>(call: &GoNode<'r>) -> Option<GoNode<'r>> {
    let function = call.field("function")?;
    if function.kind() != "identifier" || !CONVERSION_TYPES.iter().any(|ty| *ty == function.text()) {
        return None;
    }
    match call_arguments(call).as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

/// Peel `&` and parentheses, as in `Subscribe(&vo.SubscribeParam{...})`
pub fn strip_address<'r>(node: &GoNode<'r>) -> GoNode<'r> {
    let mut current = node.clone();
    loop {
        let next = match &*current.kind() {
            "parenthesized_expression" => single_named_child(&current),
            "unary_expression" if current.text().starts_with('&') => current.field("operand"),
            _ => None,
        };
        match next {
            Some(inner) => current = inner,
            None => return current,
        }
    }
}

pub fn call_arguments<'r>(call: &GoNode<'r>) -> Vec<GoNode<'r>> {
    call.field("arguments")
        .map(|args| named_children(&args))
        .unwrap_or_default()
}

/// How a call expression names its callee
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// `name(...)`
    Bare(String),
    /// `operand.field(...)`
    Selector { operand: String, field: String },
}

impl Callee {
    pub fn of(call: &GoNode<'_>) -> Option<Self> {
        if call.kind() != "call_expression" {
            return None;
        }
        let function = call.field("function")?;
        match &*function.kind() {
            "identifier" => Some(Callee::Bare(function.text().to_string())),
            "selector_expression" => Some(Callee::Selector {
                operand: function.field("operand")?.text().to_string(),
                field: function.field("field")?.text().to_string(),
            }),
            _ => None,
        }
    }

    pub fn selected_field(&self) -> Option<&str> {
        match self {
            Callee::Selector { field, .. } => Some(field),
            Callee::Bare(_) => None,
        }
    }
}

/// Final segment of a composite literal's type: `vo.SubscribeParam` -> `SubscribeParam`
pub fn composite_type_name(composite: &GoNode<'_>) -> Option<String> {
    if composite.kind() != "composite_literal" {
        return None;
    }
    let ty = composite.field("type")?.text().to_string();
    let base = ty.split('[').next().unwrap_or(&ty);
    base.rsplit('.').next().map(str::to_string)
}

/// `Key: value` entries of a composite literal, values unwrapped from `literal_element`
pub fn keyed_entries<'r>(composite: &GoNode<'r>) -> Vec<(String, GoNode<'r>)> {
    let Some(body) = composite.field("body") else {
        return Vec::new();
    };

    named_children(&body)
        .into_iter()
        .filter(|element| element.kind() == "keyed_element")
        .filter_map(|element| {
            let parts = named_children(&element);
            if parts.len() < 2 {
                return None;
            }
            let (key, value) = (parts.first()?, parts.last()?);
            let key = strip_value(key).text().trim().to_string();
            Some((key, strip_value(value)))
        })
        .collect()
}

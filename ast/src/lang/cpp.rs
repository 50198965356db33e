use super::LanguageRules;
use crate::classifier::ClassifyContext;
use crate::classifier::Role;
use crate::naming::NameOutcome;
use crate::naming::SymbolName;
use crate::naming::field_text;
use crate::naming::node_text;
use crate::types::SymbolKind;
use tree_sitter::Node;

pub(crate) struct CppRules;

const TYPE_SPECIFIERS: [&str; 4] = [
    "class_specifier",
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
];

impl LanguageRules for CppRules {
    fn classify_kind(&self, kind: &str) -> Role {
        match kind {
            "namespace_definition" => Role::Scope,

            "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier"
            | "function_definition" | "lambda_expression" => Role::Definition,

            _ => Role::Other,
        }
    }

    fn classify(&self, node: Node<'_>, _source: &[u8], ctx: ClassifyContext) -> Role {
        let kind = node.kind();
        if TYPE_SPECIFIERS.contains(&kind) {
            // `class Robot;` and `struct Robot* r;` only mention the type
            return if node.child_by_field_name("body").is_some() {
                Role::Definition
            } else {
                Role::Other
            };
        }
        if matches!(kind, "field_declaration" | "declaration") {
            return if ctx.in_type && is_member_position(node) && function_declarator(node).is_some()
            {
                Role::Definition
            } else {
                Role::Other
            };
        }
        self.classify_kind(kind)
    }

    fn unwrap_wrapper<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if node.kind() != "template_declaration" {
            return None;
        }
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|c| {
                !matches!(
                    c.kind(),
                    "template_parameter_list" | "requires_clause" | "comment"
                )
            })
            .last()
    }

    fn extract_name(&self, node: Node<'_>, source: &[u8]) -> NameOutcome {
        let kind = node.kind();
        let name = if TYPE_SPECIFIERS.contains(&kind) {
            node.child_by_field_name("name")
                .and_then(|n| declarator_name(n, source))
        } else if matches!(
            kind,
            "function_definition" | "field_declaration" | "declaration"
        ) {
            callable_name(node, source)
        } else {
            None
        };

        match name {
            Some(name) => NameOutcome::Named(name),
            None => NameOutcome::Anonymous,
        }
    }

    fn scope_name(&self, node: Node<'_>, source: &[u8]) -> Option<Vec<String>> {
        // `namespace a::b {` names two scopes at once
        let name = node.child_by_field_name("name")?;
        let mut segments = Vec::new();
        namespace_segments(name, source, &mut segments);
        (!segments.is_empty()).then_some(segments)
    }

    fn symbol_kind(&self, node: Node<'_>, name: &SymbolName, ctx: ClassifyContext) -> SymbolKind {
        match node.kind() {
            k if TYPE_SPECIFIERS.contains(&k) => SymbolKind::Type,
            "field_declaration" | "declaration" => SymbolKind::Method,
            "function_definition" if ctx.in_type || name.is_qualified() => SymbolKind::Method,
            "function_definition" => SymbolKind::Function,
            _ => SymbolKind::Fallback,
        }
    }

    fn allows_nesting(&self, node: Node<'_>) -> bool {
        // function bodies stay opaque: local classes and lambdas are not
        // addressable from outside
        matches!(
            node.kind(),
            "class_specifier" | "struct_specifier" | "union_specifier"
        )
    }

    fn is_declaration_only(&self, node: Node<'_>) -> bool {
        matches!(node.kind(), "field_declaration" | "declaration")
    }
}

/// Member prototypes sit directly in a class body, possibly behind a
/// `template<...>` header.
fn is_member_position(node: Node<'_>) -> bool {
    node.parent().is_some_and(|p| {
        matches!(
            p.kind(),
            "field_declaration_list" | "template_declaration"
        )
    })
}

/// The `function_declarator` of a definition or prototype, looking
/// through pointer, reference and parenthesized declarators.
fn function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        current = match current.kind() {
            "function_declarator" => return Some(current),
            "pointer_declarator"
            | "reference_declarator"
            | "attributed_declarator"
            | "parenthesized_declarator" => match current.child_by_field_name("declarator") {
                Some(inner) => inner,
                None => last_named_child(current)?,
            },
            _ => return None,
        };
    }
}

fn callable_name(node: Node<'_>, source: &[u8]) -> Option<SymbolName> {
    if let Some(declarator) = node.child_by_field_name("declarator")
        && declarator.kind() == "operator_cast"
    {
        return declarator_name(declarator, source);
    }
    let declarator = function_declarator(node)?.child_by_field_name("declarator")?;
    declarator_name(declarator, source)
}

/// Name carried by a declarator or type-name node
fn declarator_name(node: Node<'_>, source: &[u8]) -> Option<SymbolName> {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "namespace_identifier" => {
            node_text(node, source).map(SymbolName::new)
        }
        "destructor_name" => {
            let text = node_text(node, source)?;
            Some(SymbolName::new(strip_whitespace(&text)))
        }
        "operator_name" => operator_name(&node_text(node, source)?).map(SymbolName::new),
        "operator_cast" => {
            let ty = field_text(node, "type", source)?;
            Some(SymbolName::new(format!(
                "operator {}",
                ty.split_whitespace().collect::<Vec<_>>().join(" ")
            )))
        }
        "template_function" | "template_method" | "template_type" => {
            declarator_name(node.child_by_field_name("name")?, source)
        }
        "qualified_identifier" => qualified_name(node, source),
        _ => None,
    }
}

/// `ns::Robot::speak` → qualifier `[ns, Robot]`, local `speak`.
/// Template arguments in the scope chain are dropped.
fn qualified_name(node: Node<'_>, source: &[u8]) -> Option<SymbolName> {
    let mut qualifier = Vec::new();
    let mut current = node;
    while current.kind() == "qualified_identifier" {
        if let Some(scope) = current.child_by_field_name("scope") {
            let scope = declarator_name(scope, source)?;
            qualifier.extend(scope.segments().map(str::to_string));
        }
        current = current.child_by_field_name("name")?;
    }
    let inner = declarator_name(current, source)?;
    qualifier.extend(inner.qualifier);
    Some(SymbolName::qualified(qualifier, inner.local))
}

/// `operator +` → `operator+`, `operator  new[]` → `operator new[]`
fn operator_name(text: &str) -> Option<String> {
    let rest = text.strip_prefix("operator")?.trim();
    if rest.is_empty() {
        return None;
    }
    if rest.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        let word: String = rest.split_whitespace().collect::<Vec<_>>().join(" ");
        Some(format!("operator {word}"))
    } else {
        Some(format!("operator{}", strip_whitespace(rest)))
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).last()
}

/// Identifiers of a namespace name in source order; the `inline` keyword
/// is an anonymous token and never becomes a segment
fn namespace_segments(node: Node<'_>, source: &[u8], segments: &mut Vec<String>) {
    if matches!(node.kind(), "namespace_identifier" | "identifier") {
        if let Some(text) = node_text(node, source) {
            segments.push(text);
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        namespace_segments(child, source, segments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operator_names() {
        assert_eq!(operator_name("operator+").as_deref(), Some("operator+"));
        assert_eq!(operator_name("operator +").as_deref(), Some("operator+"));
        assert_eq!(operator_name("operator ( )").as_deref(), Some("operator()"));
        assert_eq!(operator_name("operator[]").as_deref(), Some("operator[]"));
        assert_eq!(
            operator_name("operator  new[]").as_deref(),
            Some("operator new[]")
        );
        assert_eq!(
            operator_name("operator \"\"_km").as_deref(),
            Some("operator\"\"_km")
        );
        assert_eq!(operator_name("operator"), None);
    }

    fn namespace_names(code: &str) -> Vec<Vec<String>> {
        let parsed = crate::language_registry::LanguageRegistry::new()
            .parse(crate::language_registry::Language::Cpp, code)
            .unwrap();
        let mut names = Vec::new();
        let mut stack = vec![parsed.tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "namespace_definition" {
                names.push(CppRules.scope_name(node, code.as_bytes()).unwrap());
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        names
    }

    #[test]
    fn test_namespace_names_keep_inline_prefixed_identifiers() {
        assert_eq!(namespace_names("namespace inlined {}\n"), vec![vec!["inlined"]]);
        assert_eq!(
            namespace_names("namespace inline_utils {}\n"),
            vec![vec!["inline_utils"]]
        );
        assert_eq!(namespace_names("namespace a::b {}\n"), vec![vec!["a", "b"]]);
        assert_eq!(
            namespace_names("inline namespace v2 {}\n"),
            vec![vec!["v2"]]
        );
    }

    #[test]
    fn test_destructor_whitespace() {
        assert_eq!(strip_whitespace("~ Robot"), "~Robot");
    }
}

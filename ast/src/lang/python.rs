use super::LanguageRules;
use crate::classifier::ClassifyContext;
use crate::classifier::Role;
use crate::naming::NameOutcome;
use crate::naming::SymbolName;
use crate::naming::field_text;
use crate::types::SymbolKind;
use tree_sitter::Node;

pub(crate) struct PythonRules;

impl LanguageRules for PythonRules {
    fn classify_kind(&self, kind: &str) -> Role {
        match kind {
            "function_definition" | "class_definition" | "lambda" => Role::Definition,
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                Role::ImportBlock
            }
            _ => Role::Other,
        }
    }

    fn classify(&self, node: Node<'_>, source: &[u8], ctx: ClassifyContext) -> Role {
        match node.kind() {
            "if_statement" if ctx.at_root && is_main_guard(node, source) => Role::MainBlock,
            kind => match self.classify_kind(kind) {
                Role::ImportBlock if !ctx.at_root => Role::Other,
                role => role,
            },
        }
    }

    fn unwrap_wrapper<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if node.kind() == "decorated_definition" {
            node.child_by_field_name("definition")
        } else {
            None
        }
    }

    fn extract_name(&self, node: Node<'_>, source: &[u8]) -> NameOutcome {
        match node.kind() {
            "function_definition" | "class_definition" => {
                NameOutcome::from_text(field_text(node, "name", source))
            }
            _ => NameOutcome::Anonymous,
        }
    }

    fn symbol_kind(&self, node: Node<'_>, _name: &SymbolName, ctx: ClassifyContext) -> SymbolKind {
        match node.kind() {
            "class_definition" => SymbolKind::Type,
            "function_definition" if ctx.in_type => SymbolKind::Method,
            "function_definition" => SymbolKind::Function,
            _ => SymbolKind::Fallback,
        }
    }

    fn allows_nesting(&self, node: Node<'_>) -> bool {
        matches!(node.kind(), "function_definition" | "class_definition")
    }

    fn is_header_trivia(&self, node: Node<'_>, _source: &[u8]) -> bool {
        match node.kind() {
            "comment" => true,
            // module docstring and other bare string statements
            "expression_statement" => {
                node.named_child_count() == 1
                    && node
                        .named_child(0)
                        .is_some_and(|c| matches!(c.kind(), "string" | "concatenated_string"))
            }
            _ => false,
        }
    }
}

/// `if __name__ == "__main__":` in either operand order and quote style
fn is_main_guard(node: Node<'_>, source: &[u8]) -> bool {
    let Some(condition) = node.child_by_field_name("condition") else {
        return false;
    };
    if condition.kind() != "comparison_operator" {
        return false;
    }
    let Ok(text) = condition.utf8_text(source) else {
        return false;
    };
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '"' } else { c })
        .collect();
    normalized == "__name__==\"__main__\"" || normalized == "\"__main__\"==__name__"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_registry::Language;
    use crate::language_registry::LanguageRegistry;

    fn first_statement_is_guard(code: &str) -> bool {
        let registry = LanguageRegistry::new();
        let parsed = registry.parse(Language::Python, code).unwrap();
        let node = parsed.tree.root_node().named_child(0).unwrap();
        is_main_guard(node, code.as_bytes())
    }

    #[test]
    fn test_main_guard_variants() {
        assert!(first_statement_is_guard(
            "if __name__ == \"__main__\":\n    main()\n"
        ));
        assert!(first_statement_is_guard(
            "if '__main__' == __name__:\n    main()\n"
        ));
        assert!(!first_statement_is_guard(
            "if __name__ != '__main__':\n    main()\n"
        ));
        assert!(!first_statement_is_guard("if debug:\n    main()\n"));
    }

    #[test]
    fn test_docstring_is_header_trivia() {
        let registry = LanguageRegistry::new();
        let code = "\"\"\"Module docs.\"\"\"\nx = 1\n";
        let parsed = registry.parse(Language::Python, code).unwrap();
        let root = parsed.tree.root_node();
        let docstring = root.named_child(0).unwrap();
        let assignment = root.named_child(1).unwrap();

        assert!(PythonRules.is_header_trivia(docstring, code.as_bytes()));
        assert!(!PythonRules.is_header_trivia(assignment, code.as_bytes()));
    }
}

use super::LanguageRules;
use super::named_child_of_kind;
use crate::classifier::ClassifyContext;
use crate::classifier::Role;
use crate::naming::NameOutcome;
use crate::naming::SymbolName;
use crate::naming::field_text;
use crate::naming::node_text;
use crate::types::SymbolKind;
use tree_sitter::Node;

pub(crate) struct GoRules;

impl LanguageRules for GoRules {
    fn classify_kind(&self, kind: &str) -> Role {
        match kind {
            "function_declaration"
            | "method_declaration"
            | "type_spec"
            | "type_alias"
            | "method_elem"
            | "method_spec"
            | "func_literal" => Role::Definition,

            "import_declaration" => Role::ImportBlock,

            "struct_type" | "interface_type" => Role::Scope,

            _ => Role::Other,
        }
    }

    fn classify(&self, node: Node<'_>, _source: &[u8], ctx: ClassifyContext) -> Role {
        match self.classify_kind(node.kind()) {
            Role::ImportBlock if !ctx.at_root => Role::Other,
            role => role,
        }
    }

    fn extract_name(&self, node: Node<'_>, source: &[u8]) -> NameOutcome {
        match node.kind() {
            "method_declaration" => {
                let receiver = node
                    .child_by_field_name("receiver")
                    .and_then(|r| receiver_type(r, source));
                match (receiver, field_text(node, "name", source)) {
                    (Some(receiver), Some(name)) => {
                        NameOutcome::Named(SymbolName::qualified(vec![receiver], name))
                    }
                    _ => NameOutcome::Anonymous,
                }
            }
            "function_declaration" | "type_spec" | "type_alias" | "method_elem"
            | "method_spec" => NameOutcome::from_text(field_text(node, "name", source)),
            _ => NameOutcome::Anonymous,
        }
    }

    fn symbol_kind(&self, node: Node<'_>, _name: &SymbolName, _ctx: ClassifyContext) -> SymbolKind {
        match node.kind() {
            "method_declaration" | "method_elem" | "method_spec" => SymbolKind::Method,
            "type_spec" | "type_alias" => SymbolKind::Type,
            "function_declaration" => SymbolKind::Function,
            _ => SymbolKind::Fallback,
        }
    }

    fn allows_nesting(&self, node: Node<'_>) -> bool {
        matches!(
            node.kind(),
            "function_declaration" | "method_declaration" | "type_spec" | "type_alias"
        )
    }
}

/// Base type name of a method receiver: `(u *User)` and `(s Stack[T])`
/// both resolve to the bare type identifier.
fn receiver_type(receiver: Node<'_>, source: &[u8]) -> Option<String> {
    let param = named_child_of_kind(receiver, "parameter_declaration")?;
    let mut ty = param.child_by_field_name("type")?;
    loop {
        ty = match ty.kind() {
            "type_identifier" => return node_text(ty, source),
            "generic_type" => ty.child_by_field_name("type")?,
            "pointer_type" | "parenthesized_type" => ty.named_child(0)?,
            _ => return None,
        };
    }
}

//! Per-language classification and naming tables.
//!
//! Adding a language means adding a [`Language`] variant and one
//! [`LanguageRules`] implementation here; the traversal in
//! [`crate::path_builder`] is shared.

mod cpp;
mod go;
mod python;

use crate::classifier::ClassifyContext;
use crate::classifier::Role;
use crate::language_registry::Language;
use crate::naming::NameOutcome;
use crate::naming::SymbolName;
use crate::types::SymbolKind;
use tree_sitter::Node;

pub(crate) trait LanguageRules: Sync {
    /// Role of a node kind, independent of placement
    fn classify_kind(&self, kind: &str) -> Role;

    /// Role of an (already unwrapped) node in its context
    fn classify(&self, node: Node<'_>, _source: &[u8], _ctx: ClassifyContext) -> Role {
        self.classify_kind(node.kind())
    }

    /// The declaration a wrapper node carries, `None` for non-wrappers
    fn unwrap_wrapper<'t>(&self, _node: Node<'t>) -> Option<Node<'t>> {
        None
    }

    fn extract_name(&self, node: Node<'_>, source: &[u8]) -> NameOutcome;

    /// Declared name of a `Scope` node, split into path segments.
    /// `None` makes the scope transparent.
    fn scope_name(&self, _node: Node<'_>, _source: &[u8]) -> Option<Vec<String>> {
        None
    }

    fn symbol_kind(&self, node: Node<'_>, name: &SymbolName, ctx: ClassifyContext) -> SymbolKind;

    /// Whether symbols nested in this definition are extracted
    fn allows_nesting(&self, node: Node<'_>) -> bool;

    /// Declarations without a body lose path collisions to definitions
    fn is_declaration_only(&self, _node: Node<'_>) -> bool {
        false
    }

    /// Nodes folded into the front of a leading import run
    fn is_header_trivia(&self, node: Node<'_>, _source: &[u8]) -> bool {
        node.kind() == "comment"
    }

    /// Nodes that may sit between two imports without ending the run
    fn is_interstitial(&self, node: Node<'_>) -> bool {
        node.kind() == "comment"
    }
}

pub(crate) fn rules(language: Language) -> &'static dyn LanguageRules {
    match language {
        Language::Go => &go::GoRules,
        Language::Cpp => &cpp::CppRules,
        Language::Python => &python::PythonRules,
    }
}

/// First named child of `node` with the given kind
pub(crate) fn named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() == kind)
}

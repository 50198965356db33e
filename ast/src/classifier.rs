//! Node classification: raw tree-sitter kinds to semantic roles.
//!
//! Every language contributes one table (see [`crate::lang`]); nothing in
//! the traversal knows about concrete node kinds.

use crate::lang;
use crate::language_registry::Language;
use serde::Serialize;
use tree_sitter::Node;

/// Semantic role of a syntax node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    /// Introduces an addressable symbol
    Definition,
    /// One statement of a run of imports, addressed together as `__import__`
    ImportBlock,
    /// Module-level entry guard, addressed as `__main__`
    MainBlock,
    /// Contributes a name prefix without being a leaf symbol
    Scope,
    /// Traversed transparently
    Other,
}

/// Where a node sits, for kinds whose role depends on placement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyContext {
    /// Direct child of the tree's root node
    pub at_root: bool,
    /// Innermost enclosing frame is a type (class, struct, ...)
    pub in_type: bool,
}

/// Table lookup for a node kind. Total: unknown kinds are `Other`.
pub fn classify_kind(kind: &str, language: Language) -> Role {
    lang::rules(language).classify_kind(kind)
}

/// Unwrap template/decorator wrappers down to the declaration they carry.
///
/// Returns `node` itself when it is not a wrapper, or when the wrapper is
/// malformed and carries nothing.
pub fn resolve_effective(node: Node<'_>, language: Language) -> Node<'_> {
    let rules = lang::rules(language);
    let mut current = node;
    while let Some(inner) = rules.unwrap_wrapper(current) {
        current = inner;
    }
    current
}

/// Classify a node after effective-node resolution
pub fn classify(node: Node<'_>, source: &[u8], language: Language, ctx: ClassifyContext) -> Role {
    let effective = resolve_effective(node, language);
    lang::rules(language).classify(effective, source, ctx)
}

//! Name extraction for definition nodes

use crate::classifier::resolve_effective;
use crate::lang;
use crate::language_registry::Language;
use tree_sitter::Node;

/// Synthetic name of a module-level entry guard
pub const MAIN_BLOCK_NAME: &str = "__main__";
/// Synthetic name of a run of import statements
pub const IMPORT_BLOCK_NAME: &str = "__import__";

/// Local name of a definition.
///
/// `qualifier` holds segments that belong between the enclosing scope and
/// the local name: a Go receiver type, or the class chain of an out-of-line
/// C++ member definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolName {
    pub qualifier: Vec<String>,
    pub local: String,
}

impl SymbolName {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            qualifier: Vec::new(),
            local: local.into(),
        }
    }

    pub fn qualified(qualifier: Vec<String>, local: impl Into<String>) -> Self {
        Self {
            qualifier,
            local: local.into(),
        }
    }

    /// Segments in path order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.qualifier
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.local.as_str()))
    }

    pub const fn is_qualified(&self) -> bool {
        !self.qualifier.is_empty()
    }
}

impl std::fmt::Display for SymbolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.qualifier {
            write!(f, "{segment}.")?;
        }
        f.write_str(&self.local)
    }
}

/// Result of naming a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOutcome {
    Named(SymbolName),
    Anonymous,
}

impl NameOutcome {
    pub fn named(local: impl Into<String>) -> Self {
        Self::Named(SymbolName::new(local))
    }

    /// `Named` when `name` is a usable segment, `Anonymous` otherwise
    pub(crate) fn from_text(name: Option<String>) -> Self {
        match name {
            Some(name) if is_usable_segment(&name) => Self::named(name),
            _ => Self::Anonymous,
        }
    }

    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// Extract the local name of a definition node
pub fn extract_name(node: Node<'_>, source: &[u8], language: Language) -> NameOutcome {
    let effective = resolve_effective(node, language);
    lang::rules(language).extract_name(effective, source)
}

/// Text of a node, `None` for empty or non-UTF-8 slices
pub(crate) fn node_text(node: Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Text of a named field
pub(crate) fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|child| node_text(child, source))
}

/// Segments must not contain the separators of the path grammar
fn is_usable_segment(name: &str) -> bool {
    if name.is_empty() || name.contains('.') {
        return false;
    }
    // `operator new`, `operator bool`
    name.starts_with("operator") || !name.chars().any(char::is_whitespace)
}

/// Names that collide with generated segments: fallback `near_<L>`/`at_<L>`
/// and the synthetic block names
pub(crate) fn is_reserved_segment(name: &str) -> bool {
    if name == MAIN_BLOCK_NAME || name == IMPORT_BLOCK_NAME {
        return true;
    }
    ["near_", "at_"].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    })
}

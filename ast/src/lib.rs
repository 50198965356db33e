//! Symtrace AST - stable symbol paths for Go, C++ and Python
//!
//! Every named definition in a tree-sitter syntax tree gets a dotted,
//! file-unique path (`User.GetName`, `AI.Robot.speak`, `Outer.Inner.m`).
//! Nameless definitions are addressed by line (`near_12`, `at_30`), import
//! runs and main guards by the synthetic names `__import__` and `__main__`.
//! Combined with the file path this forms an address such as
//! `pkg/user.go/User.GetName` that survives unrelated edits.

pub mod address;
pub mod classifier;
pub mod code_index;
pub mod code_map;
pub mod config;
pub mod error;
mod lang;
pub mod language_registry;
pub mod naming;
pub mod path_builder;
pub mod types;

pub use address::SymbolAddress;
pub use classifier::ClassifyContext;
pub use classifier::Role;
pub use code_index::CodeIndex;
pub use code_map::CodeMap;
pub use config::ResolverConfig;
pub use error::Diagnostic;
pub use error::ResolveError;
pub use error::ResolveResult;
pub use language_registry::Language;
pub use language_registry::LanguageRegistry;
pub use naming::NameOutcome;
pub use naming::SymbolName;
pub use path_builder::PathBuilder;
pub use types::ParsedSource;
pub use types::SymbolKind;
pub use types::SymbolRecord;

use std::path::Path;
use tree_sitter::Tree;

/// Build the code map of an already parsed tree
pub fn resolve_tree(
    tree: &Tree,
    source: &str,
    language: Language,
    file: impl AsRef<Path>,
) -> ResolveResult<CodeMap> {
    PathBuilder::new(language, source).build(tree.root_node(), file)
}

/// Parse `source` and build its code map
pub fn resolve_source(
    language: Language,
    source: &str,
    file: impl AsRef<Path>,
) -> ResolveResult<CodeMap> {
    let parsed = LanguageRegistry::new().parse(language, source)?;
    resolve_tree(&parsed.tree, &parsed.source, language, file)
}

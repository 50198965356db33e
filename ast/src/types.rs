//! Core types shared by the resolver stages

use crate::language_registry::Language;
use serde::Serialize;
use std::path::PathBuf;
use tree_sitter::Node;
use tree_sitter::Tree;

/// Source text together with the tree parsed from it
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub tree: Tree,
    pub source: String,
    pub language: Language,
}

/// Kind of an addressable symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Namespace,
    ImportBlock,
    MainBlock,
    Fallback,
}

impl SymbolKind {
    /// Get display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Type => "type",
            Self::Namespace => "namespace",
            Self::ImportBlock => "import",
            Self::MainBlock => "main",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// One addressable symbol of a file.
///
/// Lines are 1-based and inclusive; bytes are a half-open range into the
/// source the tree was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolRecord {
    pub path: String,
    pub kind: SymbolKind,
    pub file: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl SymbolRecord {
    pub(crate) fn from_node(path: String, kind: SymbolKind, file: PathBuf, node: Node<'_>) -> Self {
        Self::spanning(path, kind, file, node, node)
    }

    /// Record covering `first` through `last` (siblings, in source order)
    pub(crate) fn spanning(
        path: String,
        kind: SymbolKind,
        file: PathBuf,
        first: Node<'_>,
        last: Node<'_>,
    ) -> Self {
        let start_line = start_line(first);
        Self {
            path,
            kind,
            file,
            start_line,
            end_line: end_line(last).max(start_line),
            start_byte: first.start_byte(),
            end_byte: last.end_byte(),
        }
    }

    /// Whether `line` falls inside this symbol
    pub const fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub const fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Slice this symbol's code out of the source it was resolved from
    pub fn text<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(self.start_byte..self.end_byte)
    }

    /// Format as `<file>/<path>`
    pub fn address(&self) -> String {
        crate::address::SymbolAddress::new(self.file.clone(), self.path.clone()).to_string()
    }
}

/// 1-based line a node starts on
pub(crate) fn start_line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// 1-based line a node ends on.
///
/// Nodes that swallow a trailing newline end at column 0 of the next row;
/// their last line is the previous one.
pub(crate) fn end_line(node: Node<'_>) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

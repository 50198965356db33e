//! Per-file symbol table: path lookup and line containment queries.

use crate::error::Diagnostic;
use crate::language_registry::Language;
use crate::types::SymbolKind;
use crate::types::SymbolRecord;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::path::Path;

/// All addressable symbols of one file, in traversal order.
///
/// Built once by [`crate::path_builder::PathBuilder`] and read-only after.
#[derive(Debug, Clone)]
pub struct CodeMap {
    file: std::path::PathBuf,
    language: Language,
    records: IndexMap<String, SymbolRecord>,
    diagnostics: Vec<Diagnostic>,
    lines: LineIndex,
}

impl CodeMap {
    pub(crate) fn new(
        file: std::path::PathBuf,
        language: Language,
        records: IndexMap<String, SymbolRecord>,
        diagnostics: Vec<Diagnostic>,
        reopened: Vec<LineSpan>,
    ) -> Self {
        let lines = LineIndex::new(records.values(), reopened);
        Self {
            file,
            language,
            records,
            diagnostics,
            lines,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Record stored under an exact dotted path
    pub fn lookup(&self, path: &str) -> Option<&SymbolRecord> {
        self.records.get(path)
    }

    /// Innermost symbol containing `line` of `file`.
    ///
    /// `None` when `file` is not the file this map was built for, or when
    /// no symbol covers the line.
    pub fn find_enclosing(&self, file: &Path, line: usize) -> Option<&SymbolRecord> {
        if file != self.file {
            return None;
        }
        self.enclosing(line)
    }

    /// Innermost symbol containing `line`: smallest span, then deepest path.
    ///
    /// Every block of a reopened namespace counts as a span of the one
    /// namespace record.
    pub fn enclosing(&self, line: usize) -> Option<&SymbolRecord> {
        self.containing(line)
            .min_by(|a, b| innermost_first(*a, *b))
            .map(|(_, record)| record)
    }

    /// Every symbol containing `line`, innermost first
    pub fn enclosing_chain(&self, line: usize) -> Vec<&SymbolRecord> {
        let mut chain: Vec<(LineSpan, &SymbolRecord)> = self.containing(line).collect();
        chain.sort_by(|a, b| innermost_first(*a, *b));
        chain.into_iter().map(|(_, record)| record).collect()
    }

    fn containing(&self, line: usize) -> impl Iterator<Item = (LineSpan, &SymbolRecord)> + '_ {
        self.lines.containing(line).filter_map(|span| {
            self.records
                .get_index(span.record)
                .map(|(_, record)| (span, record))
        })
    }

    pub fn records(&self) -> impl Iterator<Item = &SymbolRecord> {
        self.records.values()
    }

    pub fn iter(&self) -> indexmap::map::Values<'_, String, SymbolRecord> {
        self.records.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// `(path, kind, start_line, end_line)` for every symbol
    pub fn entries(&self) -> impl Iterator<Item = (&str, SymbolKind, usize, usize)> {
        self.records
            .values()
            .map(|r| (r.path.as_str(), r.kind, r.start_line, r.end_line))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn collisions(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::PathCollision { .. }))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnparsableNode { .. }))
    }
}

impl<'a> IntoIterator for &'a CodeMap {
    type Item = &'a SymbolRecord;
    type IntoIter = indexmap::map::Values<'a, String, SymbolRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

fn innermost_first(
    (a_span, a): (LineSpan, &SymbolRecord),
    (b_span, b): (LineSpan, &SymbolRecord),
) -> Ordering {
    a_span
        .len()
        .cmp(&b_span.len())
        .then_with(|| b.path.len().cmp(&a.path.len()))
        .then_with(|| b_span.start.cmp(&a_span.start))
        .then_with(|| b.start_byte.cmp(&a.start_byte))
}

/// Line spans sorted by start line, so containment queries only scan
/// spans that start at or before the queried line.
#[derive(Debug, Clone, Default)]
struct LineIndex {
    spans: Vec<LineSpan>,
}

/// Inclusive line range of one record (or one block of a reopened
/// namespace), by record position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineSpan {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) record: usize,
}

impl LineSpan {
    const fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

impl LineIndex {
    fn new<'a>(records: impl Iterator<Item = &'a SymbolRecord>, extra: Vec<LineSpan>) -> Self {
        let mut spans: Vec<LineSpan> = records
            .enumerate()
            .map(|(record, r)| LineSpan {
                start: r.start_line,
                end: r.end_line,
                record,
            })
            .chain(extra)
            .collect();
        spans.sort_by_key(|s| (s.start, std::cmp::Reverse(s.end), s.record));
        Self { spans }
    }

    fn containing(&self, line: usize) -> impl Iterator<Item = LineSpan> + '_ {
        let upper = self.spans.partition_point(|s| s.start <= line);
        self.spans[..upper]
            .iter()
            .filter(move |s| s.end >= line)
            .copied()
    }
}

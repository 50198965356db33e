//! Depth-first traversal that turns a syntax tree into a [`CodeMap`].
//!
//! The only mutable state is the scope stack of one build call. Every
//! definition gets `stack + name` as its path; definitions without a
//! derivable name get `near_<line>` (line of the nearest enclosing named
//! definition) or `at_<line>` (their own line) as the final segment.
//! Namespaces contribute a prefix but never act as a `near_` anchor.
//! Source names shaped like those generated segments are addressed with a
//! trailing `_`.
//!
//! Paths are unique per file. On a collision the first record wins, except
//! that a body-less C++ member prototype yields to the matching definition.

use crate::classifier::ClassifyContext;
use crate::classifier::Role;
use crate::classifier::classify;
use crate::classifier::resolve_effective;
use crate::code_map::CodeMap;
use crate::code_map::LineSpan;
use crate::error::Diagnostic;
use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::lang;
use crate::lang::LanguageRules;
use crate::language_registry::Language;
use crate::naming::IMPORT_BLOCK_NAME;
use crate::naming::MAIN_BLOCK_NAME;
use crate::naming::NameOutcome;
use crate::naming::is_reserved_segment;
use crate::types::SymbolKind;
use crate::types::SymbolRecord;
use crate::types::start_line;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::trace;
use tracing::warn;
use tree_sitter::Node;

/// What pushed a scope frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Namespace,
    Type,
    Callable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFrame {
    pub name_segment: String,
    /// Line of the declaration that opened this frame
    pub line: usize,
    pub kind: FrameKind,
    /// No symbols are extracted below a terminal frame
    pub is_terminal: bool,
}

impl ScopeFrame {
    /// Named definitions anchor `near_<line>` fallbacks; namespaces do not
    pub fn is_anchor(&self) -> bool {
        self.kind != FrameKind::Namespace
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: ScopeFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ScopeFrame> {
        self.frames.pop()
    }

    pub fn innermost(&self) -> Option<&ScopeFrame> {
        self.frames.last()
    }

    pub fn nearest_anchor(&self) -> Option<&ScopeFrame> {
        self.frames.iter().rev().find(|frame| frame.is_anchor())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Dotted path of `segment` beneath the current stack
    pub fn path_with(&self, segment: &str) -> String {
        let mut path = String::new();
        for frame in &self.frames {
            path.push_str(&frame.name_segment);
            path.push('.');
        }
        path.push_str(segment);
        path
    }
}

/// Builds the code map of one file from its syntax tree
pub struct PathBuilder<'s> {
    language: Language,
    source: &'s [u8],
    rules: &'static dyn LanguageRules,
}

impl<'s> PathBuilder<'s> {
    pub fn new(language: Language, source: &'s str) -> Self {
        Self {
            language,
            source: source.as_bytes(),
            rules: lang::rules(language),
        }
    }

    /// Resolve every definition below `root`.
    ///
    /// Fails only when `root` cannot belong to a tree of this language
    /// parsed from this source; malformed subtrees degrade instead.
    pub fn build(&self, root: Node<'_>, file: impl AsRef<Path>) -> ResolveResult<CodeMap> {
        let file = file.as_ref().to_path_buf();
        self.validate_root(root, &file)?;

        let mut state = BuildState::new(file.clone());
        collect_parse_errors(root, &mut state.diagnostics);
        self.visit_children(root, true, &mut state);

        debug!(
            file = %file.display(),
            language = %self.language,
            symbols = state.records.len(),
            diagnostics = state.diagnostics.len(),
            "built code map"
        );
        Ok(CodeMap::new(
            file,
            self.language,
            state.records,
            state.diagnostics,
            state.reopened,
        ))
    }

    fn validate_root(&self, root: Node<'_>, file: &Path) -> ResolveResult<()> {
        let invalid = |reason: String| ResolveError::InvalidTree {
            file: file.display().to_string(),
            reason,
        };
        if root.kind() != self.language.root_kind() && !root.is_error() {
            return Err(invalid(format!(
                "root node is `{}`, expected `{}` for {}",
                root.kind(),
                self.language.root_kind(),
                self.language
            )));
        }
        if root.end_byte() > self.source.len() {
            return Err(invalid(format!(
                "tree spans {} bytes but the source has {}",
                root.end_byte(),
                self.source.len()
            )));
        }
        Ok(())
    }

    fn context(&self, at_root: bool, state: &BuildState) -> ClassifyContext {
        ClassifyContext {
            at_root,
            in_type: state
                .stack
                .innermost()
                .is_some_and(|frame| frame.kind == FrameKind::Type),
        }
    }

    fn visit_children(&self, parent: Node<'_>, at_root: bool, state: &mut BuildState) {
        if state.stack.innermost().is_some_and(|frame| frame.is_terminal) {
            return;
        }
        let mut cursor = parent.walk();
        let children: Vec<Node<'_>> = parent.named_children(&mut cursor).collect();

        let mut run: Option<ImportRun<'_>> = None;
        let mut trivia_start: Option<Node<'_>> = None;

        for child in children {
            let ctx = self.context(at_root, state);
            let role = classify(child, self.source, self.language, ctx);

            if role == Role::ImportBlock {
                match run.as_mut() {
                    Some(run) => run.last = child,
                    None => {
                        run = Some(ImportRun {
                            first: trivia_start.unwrap_or(child),
                            last: child,
                        });
                    }
                }
                trivia_start = None;
                continue;
            }
            if run.is_some() && self.rules.is_interstitial(child) {
                continue;
            }
            if let Some(finished) = run.take() {
                self.emit_import_run(finished, state);
            }

            if self.rules.is_header_trivia(child, self.source) {
                trivia_start.get_or_insert(child);
            } else {
                trivia_start = None;
            }

            self.visit(child, role, ctx, state);
        }

        if let Some(finished) = run {
            self.emit_import_run(finished, state);
        }
    }

    fn visit(&self, node: Node<'_>, role: Role, ctx: ClassifyContext, state: &mut BuildState) {
        match role {
            Role::Scope => self.enter_scope(node, state),
            Role::Definition => self.enter_definition(node, ctx, state),
            Role::MainBlock => {
                let path = state.stack.path_with(MAIN_BLOCK_NAME);
                let record =
                    SymbolRecord::from_node(path, SymbolKind::MainBlock, state.file.clone(), node);
                state.insert(record, false);
            }
            Role::ImportBlock => self.emit_import_run(
                ImportRun {
                    first: node,
                    last: node,
                },
                state,
            ),
            Role::Other => self.visit_children(node, false, state),
        }
    }

    fn enter_scope(&self, node: Node<'_>, state: &mut BuildState) {
        let effective = resolve_effective(node, self.language);
        let Some(segments) = self.rules.scope_name(effective, self.source) else {
            self.visit_children(effective, false, state);
            return;
        };

        let line = start_line(effective);
        let segment = segments
            .into_iter()
            .map(|segment| state.escape_reserved(segment, line))
            .collect::<Vec<_>>()
            .join(".");
        let path = state.stack.path_with(&segment);
        let record = SymbolRecord::from_node(path, SymbolKind::Namespace, state.file.clone(), node);
        state.insert(record, false);

        state.stack.push(ScopeFrame {
            name_segment: segment,
            line,
            kind: FrameKind::Namespace,
            is_terminal: false,
        });
        self.visit_children(effective, false, state);
        state.stack.pop();
    }

    fn enter_definition(&self, node: Node<'_>, ctx: ClassifyContext, state: &mut BuildState) {
        let effective = resolve_effective(node, self.language);
        let name = match self.rules.extract_name(effective, self.source) {
            NameOutcome::Named(name) => name,
            NameOutcome::Anonymous => {
                self.emit_fallback(node, state);
                return;
            }
        };

        let line = start_line(effective);
        let kind = self.rules.symbol_kind(effective, &name, ctx);
        let segment = name
            .segments()
            .map(|segment| state.escape_reserved(segment.to_string(), line))
            .collect::<Vec<_>>()
            .join(".");
        let path = state.stack.path_with(&segment);
        let record = SymbolRecord::from_node(path, kind, state.file.clone(), node);
        state.insert(record, self.rules.is_declaration_only(effective));

        state.stack.push(ScopeFrame {
            name_segment: segment,
            line,
            kind: if kind == SymbolKind::Type {
                FrameKind::Type
            } else {
                FrameKind::Callable
            },
            is_terminal: !self.rules.allows_nesting(effective),
        });
        self.visit_children(effective, false, state);
        state.stack.pop();
    }

    /// Address a nameless definition by line. Its frame is terminal.
    fn emit_fallback(&self, node: Node<'_>, state: &mut BuildState) {
        let line = start_line(node);
        let segment = match state.stack.nearest_anchor() {
            Some(anchor) => format!("near_{}", anchor.line),
            None => format!("at_{line}"),
        };
        let path = state.stack.path_with(&segment);
        debug!(line, path = %path, kind = node.kind(), "nameless definition");

        state.diagnostics.push(Diagnostic::NamelessDefinition {
            line,
            path: path.clone(),
        });
        let record = SymbolRecord::from_node(path, SymbolKind::Fallback, state.file.clone(), node);
        state.insert(record, false);

        state.stack.push(ScopeFrame {
            name_segment: segment,
            line,
            kind: FrameKind::Callable,
            is_terminal: true,
        });
        self.visit_children(node, false, state);
        state.stack.pop();
    }

    fn emit_import_run(&self, run: ImportRun<'_>, state: &mut BuildState) {
        let path = state.stack.path_with(IMPORT_BLOCK_NAME);
        let record = SymbolRecord::spanning(
            path,
            SymbolKind::ImportBlock,
            state.file.clone(),
            run.first,
            run.last,
        );
        state.insert(record, false);
    }
}

/// Record an `UnparsableNode` for every `ERROR` and `MISSING` node,
/// including those inside subtrees the traversal never enters.
fn collect_parse_errors(root: Node<'_>, diagnostics: &mut Vec<Diagnostic>) {
    if !root.has_error() {
        return;
    }
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if node.is_error() || node.is_missing() {
            let line = start_line(node);
            trace!(line, kind = node.kind(), missing = node.is_missing(), "unparsable node");
            diagnostics.push(Diagnostic::UnparsableNode { line });
            continue;
        }
        let mut cursor = node.walk();
        let broken: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| child.has_error() || child.is_missing())
            .collect();
        pending.extend(broken.into_iter().rev());
    }
}

/// Consecutive import statements, plus any header trivia just before them
struct ImportRun<'t> {
    first: Node<'t>,
    last: Node<'t>,
}

struct BuildState {
    file: PathBuf,
    stack: ScopeStack,
    records: IndexMap<String, SymbolRecord>,
    /// Paths currently held by body-less prototypes
    declarations: HashSet<String>,
    /// Later blocks of reopened namespaces, pointing at the first block's record
    reopened: Vec<LineSpan>,
    diagnostics: Vec<Diagnostic>,
}

impl BuildState {
    fn new(file: PathBuf) -> Self {
        Self {
            file,
            stack: ScopeStack::new(),
            records: IndexMap::new(),
            declarations: HashSet::new(),
            reopened: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// User names shaped like fallback or synthetic segments get a trailing
    /// `_`, so every `near_`/`at_` segment in a path is a real fallback.
    fn escape_reserved(&mut self, segment: String, line: usize) -> String {
        if !is_reserved_segment(&segment) {
            return segment;
        }
        let escaped = format!("{segment}_");
        warn!(line, name = %segment, escaped = %escaped, "reserved name escaped");
        self.diagnostics
            .push(Diagnostic::ReservedName { line, name: segment });
        escaped
    }

    fn insert(&mut self, record: SymbolRecord, declaration_only: bool) {
        let Some(index) = self.records.get_index_of(&record.path) else {
            if declaration_only {
                self.declarations.insert(record.path.clone());
            }
            self.records.insert(record.path.clone(), record);
            return;
        };

        let existing = &self.records[index];
        if existing.kind == SymbolKind::Namespace && record.kind == SymbolKind::Namespace {
            debug!(path = %record.path, line = record.start_line, "namespace reopened");
            self.reopened.push(LineSpan {
                start: record.start_line,
                end: record.end_line,
                record: index,
            });
            return;
        }

        if !declaration_only && self.declarations.remove(&record.path) {
            warn!(
                path = %record.path,
                kept = record.start_line,
                dropped = existing.start_line,
                "definition replaces prototype"
            );
            self.diagnostics.push(Diagnostic::PathCollision {
                path: record.path.clone(),
                kept_line: record.start_line,
                dropped_line: existing.start_line,
            });
            self.records[index] = record;
            return;
        }

        warn!(
            path = %record.path,
            kept = existing.start_line,
            dropped = record.start_line,
            "path collision"
        );
        self.diagnostics.push(Diagnostic::PathCollision {
            path: record.path,
            kept_line: existing.start_line,
            dropped_line: record.start_line,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_registry::LanguageRegistry;
    use pretty_assertions::assert_eq;

    fn build(language: Language, code: &str) -> CodeMap {
        let parsed = LanguageRegistry::new().parse(language, code).unwrap();
        PathBuilder::new(language, code)
            .build(parsed.tree.root_node(), "test")
            .unwrap()
    }

    fn paths(map: &CodeMap) -> Vec<&str> {
        map.paths().collect()
    }

    #[test]
    fn test_scope_stack_paths() {
        let mut stack = ScopeStack::new();
        assert_eq!(stack.path_with("main"), "main");

        stack.push(ScopeFrame {
            name_segment: "AI".to_string(),
            line: 1,
            kind: FrameKind::Namespace,
            is_terminal: false,
        });
        assert!(stack.nearest_anchor().is_none());

        stack.push(ScopeFrame {
            name_segment: "Robot".to_string(),
            line: 2,
            kind: FrameKind::Type,
            is_terminal: false,
        });
        assert_eq!(stack.path_with("speak"), "AI.Robot.speak");
        assert_eq!(stack.nearest_anchor().map(|f| f.line), Some(2));
        assert_eq!(stack.depth(), 2);

        stack.pop();
        stack.pop();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_python_nested_definitions() {
        let code = "\
class Outer:
    class Inner:
        def nested_method(self):
            def local_function():
                pass
            return local_function
";
        let map = build(Language::Python, code);
        assert_eq!(
            paths(&map),
            vec![
                "Outer",
                "Outer.Inner",
                "Outer.Inner.nested_method",
                "Outer.Inner.nested_method.local_function",
            ]
        );
        assert_eq!(
            map.lookup("Outer.Inner.nested_method").map(|r| r.kind),
            Some(SymbolKind::Method)
        );
        assert_eq!(
            map.lookup("Outer.Inner.nested_method.local_function")
                .map(|r| r.kind),
            Some(SymbolKind::Function)
        );
    }

    #[test]
    fn test_sibling_lambdas_keep_first() {
        let code = "\
def handlers():
    a = lambda: 1
    b = lambda: 2
    return a, b
";
        let map = build(Language::Python, code);
        assert_eq!(paths(&map), vec!["handlers", "handlers.near_1"]);

        let kept = map.lookup("handlers.near_1").unwrap();
        assert_eq!(kept.start_line, 2);
        assert_eq!(
            map.collisions().collect::<Vec<_>>(),
            vec![&Diagnostic::PathCollision {
                path: "handlers.near_1".to_string(),
                kept_line: 2,
                dropped_line: 3,
            }]
        );
    }

    #[test]
    fn test_top_level_lambda_is_at_own_line() {
        let code = "import os\n\nhandler = lambda x: x\n";
        let map = build(Language::Python, code);
        assert_eq!(paths(&map), vec!["__import__", "at_3"]);
        assert_eq!(map.lookup("at_3").map(|r| r.kind), Some(SymbolKind::Fallback));
    }

    #[test]
    fn test_fallback_is_terminal() {
        let code = "\
register(lambda: [
    (lambda: 0)
    for _ in range(3)
])
";
        let map = build(Language::Python, code);
        assert_eq!(paths(&map), vec!["at_1"]);
    }

    #[test]
    fn test_import_run_includes_header_comment() {
        let code = "\
# This is a comment
import os
import sys
";
        let map = build(Language::Python, code);
        let record = map.lookup("__import__").unwrap();
        assert_eq!(
            record.text(code),
            Some("# This is a comment\nimport os\nimport sys")
        );
        assert_eq!((record.start_line, record.end_line), (1, 3));
    }

    #[test]
    fn test_separate_import_runs_keep_first() {
        let code = "\
import os

def helper():
    pass

import sys
";
        let map = build(Language::Python, code);
        assert_eq!(paths(&map), vec!["__import__", "helper"]);
        assert_eq!(map.lookup("__import__").map(|r| r.end_line), Some(1));
        assert_eq!(map.collisions().count(), 1);
    }

    #[test]
    fn test_cpp_prototype_yields_to_definition() {
        let code = "\
class Robot {
public:
    void speak();
};

void Robot::speak() {
}
";
        let map = build(Language::Cpp, code);
        assert_eq!(paths(&map), vec!["Robot", "Robot.speak"]);
        let speak = map.lookup("Robot.speak").unwrap();
        assert_eq!(speak.start_line, 6);
        assert_eq!(speak.kind, SymbolKind::Method);
    }

    #[test]
    fn test_cpp_function_bodies_are_opaque() {
        let code = "\
int run() {
    auto f = [](int x) { return x; };
    struct Local { void go() {} };
    return f(1);
}
";
        let map = build(Language::Cpp, code);
        assert_eq!(paths(&map), vec!["run"]);
    }

    #[test]
    fn test_errors_inside_terminal_bodies_are_reported() {
        let code = "\
int run() {
    int x = ;
    return x;
}

void ok() {}
";
        let map = build(Language::Cpp, code);
        assert!(map.has_errors());
        assert!(map.lookup("run").is_some());
        assert!(map.lookup("ok").is_some());
    }

    #[test]
    fn test_missing_tokens_are_reported() {
        let code = "def broken(:\n    pass\n\ndef fine():\n    pass\n";
        let map = build(Language::Python, code);
        assert!(map.has_errors());
        assert!(map.lookup("fine").is_some());
    }

    #[test]
    fn test_reserved_names_are_escaped() {
        let code = "\
def at_3():
    pass

class near_1:
    def __main__(self):
        pass
";
        let map = build(Language::Python, code);
        assert_eq!(paths(&map), vec!["at_3_", "near_1_", "near_1_.__main___"]);
        assert_eq!(
            map.diagnostics().first(),
            Some(&Diagnostic::ReservedName {
                line: 1,
                name: "at_3".to_string(),
            })
        );
        assert_eq!(
            map.diagnostics()
                .iter()
                .filter(|d| matches!(d, Diagnostic::ReservedName { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn test_invalid_root_is_rejected() {
        let code = "def main():\n    pass\n";
        let parsed = LanguageRegistry::new()
            .parse(Language::Python, code)
            .unwrap();
        let result = PathBuilder::new(Language::Go, code).build(parsed.tree.root_node(), "x.py");
        assert!(matches!(result, Err(ResolveError::InvalidTree { .. })));

        let truncated = &code[..4];
        let result =
            PathBuilder::new(Language::Python, truncated).build(parsed.tree.root_node(), "x.py");
        assert!(matches!(result, Err(ResolveError::InvalidTree { .. })));
    }

    #[test]
    fn test_empty_file_is_empty_map() {
        for language in Language::ALL {
            let map = build(language, "");
            assert!(map.is_empty());
            assert!(map.diagnostics().is_empty());
        }
    }
}

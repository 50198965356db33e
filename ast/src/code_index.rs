//! Concurrent multi-file index of code maps.
//!
//! Maps are built independently per file (in parallel with rayon) and
//! shared as `Arc<CodeMap>`; a re-indexed file simply replaces its map.

use crate::address::SymbolAddress;
use crate::code_map::CodeMap;
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::language_registry::LanguageRegistry;
use crate::path_builder::PathBuilder;
use crate::types::SymbolRecord;
use dashmap::DashMap;
use rayon::prelude::*;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing::info;
use tracing::warn;
use walkdir::DirEntry;
use walkdir::WalkDir;

/// Outcome of indexing one file
pub type IndexOutcome = (PathBuf, ResolveResult<Arc<CodeMap>>);

#[derive(Debug, Default)]
pub struct CodeIndex {
    /// file -> map, keyed by the path addresses use
    maps: DashMap<PathBuf, Arc<CodeMap>>,
    registry: LanguageRegistry,
    config: ResolverConfig,
}

impl CodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            maps: DashMap::new(),
            registry: config.registry(),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Build and store the map of in-memory source text
    pub fn index_source(&self, file: impl AsRef<Path>, source: &str) -> ResolveResult<Arc<CodeMap>> {
        let file = file.as_ref();
        self.check_size(source.len())?;

        let language = self.registry.detect_language(file)?;
        let parsed = self.registry.parse(language, source)?;
        let map = PathBuilder::new(language, &parsed.source).build(parsed.tree.root_node(), file)?;

        let map = Arc::new(map);
        if self.maps.insert(file.to_path_buf(), Arc::clone(&map)).is_some() {
            debug!(file = %file.display(), "replaced code map");
        }
        Ok(map)
    }

    /// Read and index a file, keyed by `path` as given
    pub fn index_file(&self, path: impl AsRef<Path>) -> ResolveResult<Arc<CodeMap>> {
        let path = path.as_ref();
        self.index_file_as(path, path)
    }

    fn index_file_as(&self, path: &Path, key: &Path) -> ResolveResult<Arc<CodeMap>> {
        let size = std::fs::metadata(path)?.len();
        self.check_size(usize::try_from(size).unwrap_or(usize::MAX))?;
        let source = std::fs::read_to_string(path)?;
        self.index_source(key, &source)
    }

    fn check_size(&self, size: usize) -> ResolveResult<()> {
        if size > self.config.max_file_size {
            return Err(ResolveError::FileTooLarge {
                size,
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    /// Index many files in parallel. A failing file does not affect the
    /// others; every file gets its own outcome, in input order.
    pub fn index_paths(&self, paths: &[PathBuf]) -> Vec<IndexOutcome> {
        paths
            .par_iter()
            .map(|path| {
                let result = self.index_file(path);
                if let Err(e) = &result {
                    warn!("Failed to index {}: {}", path.display(), e);
                }
                (path.clone(), result)
            })
            .collect()
    }

    /// Index every supported file below `root`.
    ///
    /// Files are keyed relative to `root`, so their addresses read
    /// `pkg/user.go/User.GetName` regardless of where `root` lives.
    pub fn index_dir(&self, root: impl AsRef<Path>) -> ResolveResult<Vec<IndexOutcome>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ResolveError::IoError(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
        let mut unreadable: Vec<IndexOutcome> = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to walk {}: {}", root.display(), e);
                    let path = e.path().unwrap_or(root).to_path_buf();
                    let key = relative_key(&path, root);
                    unreadable.push((key, Err(ResolveError::IoError(e.to_string()))));
                    continue;
                }
            };
            if entry.file_type().is_file() && self.registry.is_supported(entry.path()) {
                let path = entry.into_path();
                let key = relative_key(&path, root);
                files.push((path, key));
            }
        }

        let mut outcomes: Vec<IndexOutcome> = files
            .par_iter()
            .map(|(path, key)| {
                let result = self.index_file_as(path, key);
                if let Err(e) = &result {
                    warn!("Failed to index {}: {}", path.display(), e);
                }
                (key.clone(), result)
            })
            .collect();
        outcomes.extend(unreadable);

        let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        info!(
            root = %root.display(),
            indexed = outcomes.len() - failed,
            failed,
            "indexed directory"
        );
        Ok(outcomes)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.config.is_excluded(name))
    }

    /// Record behind a `<file>/<symbol path>` address.
    ///
    /// Every `/` is tried as the split point, so indexed files inside
    /// directories with dotted names resolve as well.
    pub fn resolve(&self, address: &str) -> Option<SymbolRecord> {
        address.match_indices('/').find_map(|(index, _)| {
            let map = self.maps.get(Path::new(&address[..index]))?;
            map.lookup(&address[index + 1..]).cloned()
        })
    }

    pub fn resolve_address(&self, address: &SymbolAddress) -> Option<SymbolRecord> {
        self.maps
            .get(&address.file)
            .and_then(|map| map.lookup(&address.symbol).cloned())
    }

    /// Innermost symbol of an indexed file containing `line`
    pub fn find_enclosing(&self, file: &Path, line: usize) -> Option<SymbolRecord> {
        let map = self.maps.get(file)?;
        map.find_enclosing(file, line).cloned()
    }

    pub fn get(&self, file: &Path) -> Option<Arc<CodeMap>> {
        self.maps.get(file).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, file: &Path) -> Option<Arc<CodeMap>> {
        self.maps.remove(file).map(|(_, map)| map)
    }

    /// Indexed files, sorted
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.maps.iter().map(|e| e.key().clone()).collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn clear(&self) {
        self.maps.clear();
    }

    /// Sorted addresses starting with `prefix`, at most `limit` of them
    /// (the configured completion limit when `None`).
    pub fn complete(&self, prefix: &str, limit: Option<usize>) -> Vec<String> {
        let limit = limit.unwrap_or(self.config.completion_limit);
        let case_sensitive = self.config.case_sensitive;
        let wanted = if case_sensitive {
            prefix.to_string()
        } else {
            prefix.to_lowercase()
        };

        let mut matches: Vec<String> = self
            .maps
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .records()
                    .map(SymbolRecord::address)
                    .collect::<Vec<_>>()
            })
            .filter(|address| {
                if case_sensitive {
                    address.starts_with(&wanted)
                } else {
                    address.to_lowercase().starts_with(&wanted)
                }
            })
            .collect();
        matches.sort();
        matches.truncate(limit);
        matches
    }
}

fn relative_key(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const GO_SOURCE: &str = "\
package main

type User struct {
\tName string
}

func (u User) GetName() string {
\treturn u.Name
}
";

    const PY_SOURCE: &str = "\
import os

class Robot:
    def speak(self):
        pass
";

    #[test]
    fn test_index_source_and_resolve() {
        let index = CodeIndex::new();
        index.index_source("pkg/user.go", GO_SOURCE).unwrap();

        let record = index.resolve("pkg/user.go/User.GetName").unwrap();
        assert_eq!(record.start_line, 7);
        assert_eq!(record.end_line, 9);
        assert!(index.resolve("pkg/user.go/User.Missing").is_none());
        assert!(index.resolve("other.go/User").is_none());

        let address = SymbolAddress::parse("pkg/user.go/User").unwrap();
        assert_eq!(index.resolve_address(&address).map(|r| r.start_line), Some(3));
    }

    #[test]
    fn test_reindex_replaces_map() {
        let index = CodeIndex::new();
        index.index_source("robot.py", PY_SOURCE).unwrap();
        index
            .index_source("robot.py", "def walk():\n    pass\n")
            .unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.resolve("robot.py/Robot").is_none());
        assert!(index.resolve("robot.py/walk").is_some());
    }

    #[test]
    fn test_unsupported_and_oversized() {
        let index = CodeIndex::with_config(ResolverConfig {
            max_file_size: 16,
            ..ResolverConfig::default()
        });
        assert!(matches!(
            index.index_source("notes.txt", "hello"),
            Err(ResolveError::UnsupportedLanguage(_))
        ));
        assert!(matches!(
            index.index_source("robot.py", PY_SOURCE),
            Err(ResolveError::FileTooLarge { .. })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_find_enclosing_and_remove() {
        let index = CodeIndex::new();
        index.index_source("robot.py", PY_SOURCE).unwrap();

        let file = Path::new("robot.py");
        assert_eq!(
            index.find_enclosing(file, 5).map(|r| r.path),
            Some("Robot.speak".to_string())
        );
        assert!(index.find_enclosing(Path::new("other.py"), 5).is_none());

        assert!(index.remove(file).is_some());
        assert!(index.get(file).is_none());
    }

    #[test]
    fn test_complete() {
        let index = CodeIndex::new();
        index.index_source("robot.py", PY_SOURCE).unwrap();
        index.index_source("user.go", GO_SOURCE).unwrap();

        assert_eq!(
            index.complete("robot.py/R", None),
            vec!["robot.py/Robot", "robot.py/Robot.speak"]
        );
        assert_eq!(index.complete("user.go/", Some(1)), vec!["user.go/User"]);
        assert!(index.complete("robot.py/r", None).is_empty());

        let insensitive = CodeIndex::with_config(ResolverConfig {
            case_sensitive: false,
            ..ResolverConfig::default()
        });
        insensitive.index_source("robot.py", PY_SOURCE).unwrap();
        assert_eq!(
            insensitive.complete("ROBOT.PY/robot.s", None),
            vec!["robot.py/Robot.speak"]
        );
    }

    #[test]
    fn test_index_dir_skips_excluded_and_unsupported() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        std::fs::write(root.join("pkg/user.go"), GO_SOURCE).unwrap();
        std::fs::write(root.join("robot.py"), PY_SOURCE).unwrap();
        std::fs::write(root.join("node_modules/dep/index.py"), PY_SOURCE).unwrap();
        std::fs::write(root.join("README.md"), "# readme\n").unwrap();

        let index = CodeIndex::new();
        let outcomes = index.index_dir(root).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(
            index.files(),
            vec![PathBuf::from("pkg/user.go"), PathBuf::from("robot.py")]
        );
        assert!(index.resolve("pkg/user.go/User.GetName").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_index_dir_reports_unreadable_directories() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let locked = root.join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::write(locked.join("hidden.py"), PY_SOURCE).unwrap();
        std::fs::write(root.join("robot.py"), PY_SOURCE).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let readable_anyway = std::fs::read_dir(&locked).is_ok();
        let index = CodeIndex::new();
        let outcomes = index.index_dir(root).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if readable_anyway {
            // privileged users read through the permission bits
            assert_eq!(outcomes.len(), 2);
            return;
        }
        assert_eq!(outcomes.len(), 2);
        let failure = outcomes.iter().find(|(_, r)| r.is_err()).unwrap();
        assert_eq!(failure.0, PathBuf::from("locked"));
        assert!(matches!(failure.1, Err(ResolveError::IoError(_))));
        assert_eq!(index.files(), vec![PathBuf::from("robot.py")]);
    }

    #[test]
    fn test_index_paths_reports_failures_per_file() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("robot.py");
        let missing = dir.path().join("missing.py");
        std::fs::write(&good, PY_SOURCE).unwrap();

        let index = CodeIndex::new();
        let outcomes = index.index_paths(&[good.clone(), missing.clone()]);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, good);
        assert!(outcomes[0].1.is_ok());
        assert_eq!(outcomes[1].0, missing);
        assert!(matches!(outcomes[1].1, Err(ResolveError::IoError(_))));
        assert_eq!(index.len(), 1);
    }
}

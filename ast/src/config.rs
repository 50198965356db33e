//! `symtrace.toml` configuration

use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::language_registry::Language;
use crate::language_registry::LanguageRegistry;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "symtrace.toml";

const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_COMPLETION_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Files above this many bytes are rejected with `FileTooLarge`
    pub max_file_size: usize,

    /// Completion matches prefixes case-sensitively
    pub case_sensitive: bool,

    pub completion_limit: usize,

    /// Extra `extension -> language` detection rules
    pub extensions: BTreeMap<String, Language>,

    /// Directory names skipped while walking
    pub exclude: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            case_sensitive: true,
            completion_limit: DEFAULT_COMPLETION_LIMIT,
            extensions: BTreeMap::new(),
            exclude: [".git", "target", "node_modules", "__pycache__", "vendor"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> ResolveResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ResolveError::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// `symtrace.toml` in `dir`, or defaults when there is none
    pub fn discover(dir: &Path) -> ResolveResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> ResolveResult<()> {
        if self.max_file_size == 0 {
            return Err(ResolveError::ConfigError(
                "max_file_size must be positive".to_string(),
            ));
        }
        if let Some(ext) = self.extensions.keys().find(|ext| ext.trim_matches('.').is_empty()) {
            return Err(ResolveError::ConfigError(format!(
                "invalid extension rule `{ext}`"
            )));
        }
        Ok(())
    }

    pub fn registry(&self) -> LanguageRegistry {
        LanguageRegistry::with_overrides(self.extensions.clone())
    }

    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.exclude.iter().any(|name| name == dir_name)
    }
}

//! Language detection and parser management.
//!
//! The resolver never parses text on its own; this registry is the adapter
//! that turns source text into a tree-sitter `Tree` for callers that do not
//! already hold one.

use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::types::ParsedSource;
use std::collections::BTreeMap;
use std::path::Path;
use tree_sitter::Parser;

/// Languages with symbol-path rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Cpp,
    Python,
}

impl Language {
    pub const ALL: [Self; 3] = [Self::Go, Self::Cpp, Self::Python];

    /// Get the tree-sitter grammar
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Kind of the root node every tree of this language starts with
    pub const fn root_kind(&self) -> &'static str {
        match self {
            Self::Go => "source_file",
            Self::Cpp => "translation_unit",
            Self::Python => "module",
        }
    }

    /// Get language display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Go => "Go",
            Self::Cpp => "C++",
            Self::Python => "Python",
        }
    }

    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Go => &["go"],
            Self::Cpp => &["cpp", "cc", "cxx", "c++", "hpp", "hh", "hxx", "h"],
            Self::Python => &["py", "pyi"],
        }
    }

    /// Built-in extension mapping, without config overrides
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&extension))
    }

    /// Parse a language tag such as `go`, `cpp`, `c++` or `python`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "go" | "golang" => Some(Self::Go),
            "cpp" | "c++" | "cxx" => Some(Self::Cpp),
            "python" | "py" => Some(Self::Python),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Language registry for detection and parsing
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    overrides: BTreeMap<String, Language>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with extra `extension -> language` rules that take precedence
    pub fn with_overrides(overrides: BTreeMap<String, Language>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(ext, lang)| (ext.trim_start_matches('.').to_string(), lang))
            .collect();
        Self { overrides }
    }

    /// Detect language from file path
    pub fn detect_language(&self, path: &Path) -> ResolveResult<Language> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ResolveError::LanguageDetectionFailed(path.display().to_string()))?;

        if let Some(lang) = self.overrides.get(extension) {
            return Ok(*lang);
        }

        Language::from_extension(extension)
            .ok_or_else(|| ResolveError::UnsupportedLanguage(extension.to_string()))
    }

    /// Whether a path would be picked up by `detect_language`
    pub fn is_supported(&self, path: &Path) -> bool {
        self.detect_language(path).is_ok()
    }

    fn create_parser(&self, language: Language) -> ResolveResult<Parser> {
        // Parser is neither Clone nor Sync, so every parse gets a fresh one
        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| ResolveError::ParserError(e.to_string()))?;
        Ok(parser)
    }

    /// Parse source code for a given language
    pub fn parse(&self, language: Language, source: &str) -> ResolveResult<ParsedSource> {
        let mut parser = self.create_parser(language)?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ResolveError::ParserError("Failed to parse source code".to_string()))?;

        Ok(ParsedSource {
            tree,
            source: source.to_string(),
            language,
        })
    }
}

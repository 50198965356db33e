//! `<file>/<symbol path>` addresses

use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::language_registry::LanguageRegistry;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

/// A symbol path qualified by the file it lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolAddress {
    pub file: PathBuf,
    pub symbol: String,
}

impl SymbolAddress {
    pub fn new(file: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            symbol: symbol.into(),
        }
    }

    /// Parse with the built-in extension table
    pub fn parse(address: &str) -> ResolveResult<Self> {
        Self::parse_with(address, &LanguageRegistry::default())
    }

    /// Split at the first `/` whose left side is a supported source file.
    ///
    /// Symbol paths may themselves contain `/` (`Vec.operator/`), so the
    /// last separator is not necessarily the split point.
    pub fn parse_with(address: &str, registry: &LanguageRegistry) -> ResolveResult<Self> {
        Self::candidates(address, registry)
            .next()
            .ok_or_else(|| ResolveError::InvalidAddress(address.to_string()))
    }

    /// Like [`Self::parse_with`], but prefers the first split whose file
    /// exists below `root`, so `v1.go/main.go/main` finds the file inside
    /// a directory named `v1.go`.
    pub fn parse_in(address: &str, root: &Path, registry: &LanguageRegistry) -> ResolveResult<Self> {
        match Self::candidates(address, registry).find(|c| root.join(&c.file).is_file()) {
            Some(address) => Ok(address),
            None => Self::parse_with(address, registry),
        }
    }

    /// Every split of `address` with a supported file on the left, in
    /// order of the `/` it splits at
    pub fn candidates<'a>(
        address: &'a str,
        registry: &'a LanguageRegistry,
    ) -> impl Iterator<Item = Self> + 'a {
        address.match_indices('/').filter_map(move |(index, _)| {
            let (file, rest) = address.split_at(index);
            let symbol = &rest[1..];
            (!file.is_empty() && !symbol.is_empty() && registry.is_supported(Path::new(file)))
                .then(|| Self::new(file, symbol))
        })
    }

    /// The file rendered with `/` separators on every platform
    pub fn file_display(&self) -> String {
        let file = self.file.to_string_lossy();
        if std::path::MAIN_SEPARATOR == '/' {
            file.into_owned()
        } else {
            file.replace(std::path::MAIN_SEPARATOR, "/")
        }
    }
}

impl fmt::Display for SymbolAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file_display(), self.symbol)
    }
}

impl FromStr for SymbolAddress {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        let address = SymbolAddress::new("pkg/user.go", "User.GetName");
        assert_eq!(address.to_string(), "pkg/user.go/User.GetName");
    }

    #[test]
    fn test_parse_nested_file() {
        let address = SymbolAddress::parse("src/robot/robot.py/Robot.speak").unwrap();
        assert_eq!(address.file, PathBuf::from("src/robot/robot.py"));
        assert_eq!(address.symbol, "Robot.speak");
    }

    #[test]
    fn test_parse_symbol_with_slash() {
        let address = SymbolAddress::parse("math/vec.hpp/Vec.operator/").unwrap();
        assert_eq!(address.file, PathBuf::from("math/vec.hpp"));
        assert_eq!(address.symbol, "Vec.operator/");
    }

    #[test]
    fn test_parse_directory_with_extension_like_name() {
        // `v1.go` is a directory here, but it is still the first candidate
        let address = SymbolAddress::parse("v1.go/main.go/main").unwrap();
        assert_eq!(address.file, PathBuf::from("v1.go"));
        assert_eq!(address.symbol, "main.go/main");
    }

    #[test]
    fn test_candidates_in_separator_order() {
        let registry = LanguageRegistry::default();
        let files: Vec<PathBuf> = SymbolAddress::candidates("v1.go/main.go/main", &registry)
            .map(|c| c.file)
            .collect();
        assert_eq!(files, vec![PathBuf::from("v1.go"), PathBuf::from("v1.go/main.go")]);
    }

    #[test]
    fn test_parse_in_prefers_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("v1.go")).unwrap();
        std::fs::write(dir.path().join("v1.go/main.go"), "package main\n").unwrap();

        let registry = LanguageRegistry::default();
        let address = SymbolAddress::parse_in("v1.go/main.go/main", dir.path(), &registry).unwrap();
        assert_eq!(address.file, PathBuf::from("v1.go/main.go"));
        assert_eq!(address.symbol, "main");

        // nothing on disk: same split as `parse_with`
        let address = SymbolAddress::parse_in("pkg/user.go/User", dir.path(), &registry).unwrap();
        assert_eq!(address.file, PathBuf::from("pkg/user.go"));
        assert!(SymbolAddress::parse_in("README.md/intro", dir.path(), &registry).is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(SymbolAddress::parse("robot.py").is_err());
        assert!(SymbolAddress::parse("robot.py/").is_err());
        assert!(SymbolAddress::parse("README.md/intro").is_err());
        assert!("".parse::<SymbolAddress>().is_err());
    }
}

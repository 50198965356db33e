//! Subcommand implementations. Output goes to the given writer so the
//! commands can be exercised without a terminal.

use crate::error::CliError;
use crate::error::Result;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use symtrace_ast::CodeIndex;
use symtrace_ast::CodeMap;
use symtrace_ast::ResolverConfig;
use symtrace_ast::SymbolAddress;
use tracing::error;

/// Print every symbol of every supported file; directories are walked
pub fn map(
    config: &ResolverConfig,
    paths: &[PathBuf],
    as_json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut maps: Vec<Arc<CodeMap>> = Vec::new();
    let mut failed = 0;
    let mut total = 0;

    for path in paths {
        let index = CodeIndex::with_config(config.clone());
        let outcomes = if path.is_dir() {
            index.index_dir(path)?
        } else {
            vec![(path.clone(), index.index_file(path))]
        };
        for (file, result) in outcomes {
            total += 1;
            match result {
                Ok(map) => maps.push(map),
                Err(e) => {
                    failed += 1;
                    error!("{}: {}", file.display(), e);
                }
            }
        }
    }
    maps.sort_by(|a, b| a.file().cmp(b.file()));

    if as_json {
        let files: Vec<serde_json::Value> = maps
            .iter()
            .map(|map| {
                json!({
                    "file": map.file(),
                    "language": map.language(),
                    "symbols": map.records().collect::<Vec<_>>(),
                    "diagnostics": map.diagnostics(),
                })
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &files)?;
        writeln!(out)?;
    } else {
        for map in &maps {
            for record in map.records() {
                writeln!(
                    out,
                    "{:>5}-{:<5} {:<9} {}",
                    record.start_line,
                    record.end_line,
                    record.kind,
                    record.address()
                )?;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::IndexFailures { failed, total });
    }
    Ok(())
}

/// Print the address of the innermost symbol containing `line`
pub fn at(config: &ResolverConfig, file: &Path, line: usize, out: &mut impl Write) -> Result<()> {
    let index = CodeIndex::with_config(config.clone());
    index.index_file(file)?;
    let record = index
        .find_enclosing(file, line)
        .ok_or_else(|| CliError::NoEnclosingSymbol {
            file: file.to_path_buf(),
            line,
        })?;
    writeln!(out, "{}", record.address())?;
    Ok(())
}

/// Print a symbol's location followed by its source text
pub fn show(
    config: &ResolverConfig,
    address: &str,
    root: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let index = CodeIndex::with_config(config.clone());
    let parsed = SymbolAddress::parse_in(address, root, index.registry())?;
    let source = std::fs::read_to_string(root.join(&parsed.file))?;
    index.index_source(&parsed.file, &source)?;

    let record = index
        .resolve_address(&parsed)
        .ok_or_else(|| CliError::SymbolNotFound {
            address: address.to_string(),
        })?;
    writeln!(
        out,
        "{} ({}, lines {}-{})",
        record.address(),
        record.kind,
        record.start_line,
        record.end_line
    )?;
    if let Some(text) = record.text(&source) {
        writeln!(out, "{text}")?;
    }
    Ok(())
}

/// Print indexed addresses under `root` that start with `prefix`
pub fn complete(
    config: &ResolverConfig,
    prefix: &str,
    root: &Path,
    limit: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let index = CodeIndex::with_config(config.clone());
    index.index_dir(root)?;
    for address in index.complete(prefix, limit) {
        writeln!(out, "{address}")?;
    }
    Ok(())
}

//! symtrace - stable symbol addresses for Go, C++ and Python sources

mod commands;
mod error;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use symtrace_ast::ResolverConfig;
use tracing::Level;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

/// Resolve definitions in source files to `<file>/<symbol path>` addresses
#[derive(Parser, Debug)]
#[command(name = "symtrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./symtrace.toml when present)
    #[arg(long, global = true, env = "SYMTRACE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every symbol of the given files and directories
    Map {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Emit JSON instead of one line per symbol
        #[arg(long)]
        json: bool,
    },

    /// Print the innermost symbol containing a line
    At { file: PathBuf, line: usize },

    /// Print a symbol's location and source text
    Show {
        address: String,

        /// Directory the address's file path is relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Complete a symbol address prefix
    Complete {
        prefix: String,

        /// Directory to index
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Maximum number of results (config `completion_limit` otherwise)
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "resolved configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Map { paths, json } => commands::map(&config, &paths, json, &mut out)?,
        Command::At { file, line } => commands::at(&config, &file, line, &mut out)
            .with_context(|| format!("failed to locate line {line} of {}", file.display()))?,
        Command::Show { address, root } => commands::show(&config, &address, &root, &mut out)
            .with_context(|| format!("failed to show {address}"))?,
        Command::Complete {
            prefix,
            root,
            limit,
        } => commands::complete(&config, &prefix, &root, limit, &mut out)
            .with_context(|| format!("failed to index {}", root.display()))?,
    }
    Ok(())
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// `RUST_LOG` wins over `-v`; logs go to stderr so stdout stays parseable
fn init_tracing(verbose: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose).as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<ResolverConfig> {
    match path {
        Some(path) => ResolverConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            ResolverConfig::discover(&cwd).context("failed to load symtrace.toml")
        }
    }
}

//! Byelinear CLI - move Linear issues to GitHub
//!
//! `from-linear` stages every Linear issue on disk; `to-github` exports the
//! staged issues. Both resume where the last run stopped.

mod commands;

use std::path::PathBuf;

use byelinear_core::{CliOverrides, Config};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ExportArgs, FetchArgs, StatusArgs};

/// byelinear: resumable Linear to GitHub issue migration
#[derive(Parser, Debug)]
#[command(name = "byelinear")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Staging directory (overrides config and env)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Only fetch or export the issue with this number
    #[arg(long, global = true)]
    issue_number: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch Linear issues into the corpus
    FromLinear(FetchArgs),

    /// Export staged issues to GitHub
    ToGithub(ExportArgs),

    /// Show corpus progress
    Status(StatusArgs),

    /// Show current configuration
    Config,

    /// Show version information
    Version,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            corpus: self.corpus.clone(),
            issue_number: self.issue_number,
            ..Default::default()
        };
        match &self.command {
            Some(Commands::FromLinear(args)) => {
                overrides.page_size = args.page_size;
                overrides.cursor = args.cursor.clone();
            }
            Some(Commands::ToGithub(args)) => {
                overrides.org = args.org.clone();
                overrides.repo = args.repo.clone();
            }
            _ => {}
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = Config::load_with_overrides(cli.overrides())?;

    if cli.verbose {
        tracing::debug!(
            corpus = %config.corpus.display(),
            page_size = config.page_size,
            issue_number = ?config.issue_number,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::FromLinear(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::ToGithub(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Status(args)) => {
            args.execute(&config)?;
        }
        Some(Commands::Config) => print_config(&config),
        Some(Commands::Version) => {
            println!("byelinear {}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("byelinear - move Linear issues to GitHub");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    let unset = "(not set)";

    println!("byelinear Configuration");
    println!("=======================");
    println!();
    println!("Corpus: {}", config.corpus.display());
    println!("Page size: {}", config.page_size);
    if let Some(number) = config.issue_number {
        println!("Issue number: {}", number);
    }
    if let Some(cursor) = &config.cursor {
        println!("Cursor: {}", cursor);
    }
    println!();
    println!("GitHub:");
    println!("  org: {}", config.github.org.as_deref().unwrap_or(unset));
    println!("  repo: {}", config.github.repo.as_deref().unwrap_or(unset));
    println!();
    println!("Timing:");
    println!("  page_pause: {:?}", config.timing.page_pause);
    println!("  record_pause: {:?}", config.timing.record_pause);
    println!("  retry_backoff: {:?}", config.timing.retry_backoff);
    println!("  deadline: {:?}", config.timing.deadline);
    println!();
    println!("Identities: {} mapped", config.identities.len());
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_overrides() {
        let cli = Cli::try_parse_from([
            "byelinear",
            "--corpus",
            "/tmp/corpus",
            "from-linear",
            "--page-size",
            "10",
            "--cursor",
            "abc",
        ])
        .unwrap();
        let overrides = cli.overrides();

        assert_eq!(overrides.corpus, Some(PathBuf::from("/tmp/corpus")));
        assert_eq!(overrides.page_size, Some(10));
        assert_eq!(overrides.cursor.as_deref(), Some("abc"));
        assert!(overrides.org.is_none());
    }

    #[test]
    fn test_export_overrides_with_global_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "byelinear",
            "to-github",
            "--org",
            "acme",
            "--repo",
            "app",
            "--issue-number",
            "42",
        ])
        .unwrap();
        let overrides = cli.overrides();

        assert_eq!(overrides.org.as_deref(), Some("acme"));
        assert_eq!(overrides.repo.as_deref(), Some("app"));
        assert_eq!(overrides.issue_number, Some(42));
        assert!(overrides.page_size.is_none());
    }
}

// foliotax CLI - portfolio taxonomy enrichment, headless

mod enrich;
mod exit_codes;
mod fetch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_CONFIG, EXIT_DOCUMENT, EXIT_PERSIST, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "ftax")]
#[command(about = "Enrich portfolio documents with classification data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile breakdown data into a portfolio document's taxonomies
    #[command(after_help = "\
Examples:
  ftax enrich depot.xml --data breakdowns/
  ftax enrich depot.xml --data breakdowns/ --logs logs/ --json
  ftax enrich depot.xml --data breakdowns/ --config merge.toml --dry-run")]
    Enrich {
        /// Portfolio XML document (mutated in place)
        portfolio: PathBuf,

        /// Directory of per-identifier breakdown JSON files
        #[arg(long)]
        data: PathBuf,

        /// Engine config TOML (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Cache record path (default: <portfolio>.cache.json)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Directory for per-instrument import logs (skipped when omitted)
        #[arg(long)]
        logs: Option<PathBuf>,

        /// Reconcile but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Print the JSON run report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON run report to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate an engine config TOML without running
    #[command(after_help = "\
Examples:
  ftax validate merge.toml")]
    Validate {
        /// Path to the config TOML
        config: PathBuf,
    },

    /// Fetch breakdown data for a document's securities into a data directory
    #[command(after_help = "\
Examples:
  ftax fetch depot.xml --data breakdowns/ --base-url https://data.example.com/breakdowns
  ftax fetch depot.xml --data breakdowns/ --base-url https://data.example.com/breakdowns --refresh")]
    Fetch {
        /// Portfolio XML document naming the securities to fetch
        portfolio: PathBuf,

        /// Directory the breakdown JSON files are written to (doubles as cache)
        #[arg(long)]
        data: PathBuf,

        /// Base URL; one GET per identifier at <base-url>/<identifier>.json
        #[arg(long)]
        base_url: String,

        /// API key (flag > FOLIOTAX_API_KEY env var; omit for open endpoints)
        #[arg(long, env = "FOLIOTAX_API_KEY")]
        api_key: Option<String>,

        /// Refetch identifiers that already have a file in the data directory
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn document(msg: impl Into<String>) -> Self {
        Self { code: EXIT_DOCUMENT, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn persist(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PERSIST, message: msg.into(), hint: None }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Enrich { portfolio, data, config, cache, logs, dry_run, json, output } => {
            enrich::cmd_enrich(portfolio, data, config, cache, logs, dry_run, json, output)
        }
        Commands::Validate { config } => enrich::cmd_validate(config),
        Commands::Fetch { portfolio, data, base_url, api_key, refresh } => {
            fetch::cmd_fetch(portfolio, data, base_url, api_key, refresh)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(hint) = e.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

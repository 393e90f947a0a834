//! `ftax enrich` — reconcile breakdown data into a portfolio document.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use foliotax_core::{Instrument, PortfolioDocument};
use foliotax_engine::model::{NullLog, ReconcileReport};
use foliotax_engine::{ImportLog, MergeConfig};
use foliotax_io::{cache, portfolio, FileImportLog};

use crate::CliError;

// ---------------------------------------------------------------------------
// Breakdown files
// ---------------------------------------------------------------------------

/// Per-identifier breakdown JSON, as the fetch adapter writes it.
#[derive(Debug, Default, Deserialize)]
pub struct Breakdown {
    #[serde(default)]
    pub holdings: std::collections::BTreeMap<String, f64>,
    #[serde(default)]
    pub industries: std::collections::BTreeMap<String, f64>,
    #[serde(default)]
    pub countries: std::collections::BTreeMap<String, f64>,
}

/// Build the engine's instrument list in document order, pairing each
/// security with its breakdown file. A missing file yields an instrument
/// with empty breakdowns (nothing to merge, orphans still swept) and is
/// counted for the warning line.
fn build_instruments(
    document: &PortfolioDocument,
    data_dir: &Path,
) -> Result<(Vec<Instrument>, usize), CliError> {
    let mut instruments = Vec::with_capacity(document.securities.len());
    let mut missing = 0usize;

    for security in &document.securities {
        let mut instrument =
            Instrument::new(&security.identifier, &security.name, security.kind);
        let path = data_dir.join(format!("{}.json", security.identifier));
        if path.exists() {
            let data = std::fs::read_to_string(&path).map_err(|e| {
                CliError::document(format!("cannot read {}: {e}", path.display()))
            })?;
            let breakdown: Breakdown = serde_json::from_str(&data).map_err(|e| {
                CliError::document(format!("invalid breakdown {}: {e}", path.display()))
            })?;
            instrument.holdings = breakdown.holdings;
            instrument.industries = breakdown.industries;
            instrument.countries = breakdown.countries;
        } else {
            missing += 1;
        }
        instruments.push(instrument);
    }

    Ok((instruments, missing))
}

fn load_config(path: &Option<PathBuf>) -> Result<MergeConfig, CliError> {
    match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .map_err(|e| CliError::config(format!("cannot read {}: {e}", path.display())))?;
            MergeConfig::from_toml(&data).map_err(|e| CliError::config(e.to_string()))
        }
        None => Ok(MergeConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn cmd_enrich(
    portfolio_path: PathBuf,
    data_dir: PathBuf,
    config_path: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    logs_dir: Option<PathBuf>,
    dry_run: bool,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    let mut document = portfolio::load(&portfolio_path)
        .map_err(|e| CliError::document(e.to_string()))?;

    let (instruments, missing) = build_instruments(&document, &data_dir)?;

    let cache_path = cache_path
        .unwrap_or_else(|| PathBuf::from(format!("{}.cache.json", portfolio_path.display())));
    let previous = cache::load(&cache_path).map_err(|e| CliError::document(e.to_string()))?;

    let mut file_log = match &logs_dir {
        Some(dir) if !dry_run => {
            std::fs::create_dir_all(dir).map_err(|e| {
                CliError::persist(format!("cannot create {}: {e}", dir.display()))
            })?;
            Some(FileImportLog::new(dir))
        }
        _ => None,
    };
    let mut null_log = NullLog;
    let log: &mut dyn ImportLog = match file_log.as_mut() {
        Some(log) => log,
        None => &mut null_log,
    };

    let report = foliotax_engine::run(
        &config,
        &instruments,
        &mut document.taxonomies,
        &previous,
        log,
    )
    .map_err(|e| CliError::config(e.to_string()))?;

    // Persist document and cache independently; a failure of one must not
    // block the other, and a re-run against the same inputs is safe.
    let mut persist_errors: Vec<String> = Vec::new();
    if !dry_run {
        if let Err(e) = portfolio::save(&document, &portfolio_path) {
            persist_errors.push(e.to_string());
        }
        if let Err(e) = cache::save(&report.cache, &cache_path) {
            persist_errors.push(e.to_string());
        }
    }
    if let Some(log) = &file_log {
        persist_errors.extend(log.errors().iter().cloned());
    }

    print_report(&report, json_output, &output_file)?;

    if missing > 0 {
        eprintln!("warning: {missing} breakdown file(s) missing under {}", data_dir.display());
    }
    if report.summary.foreign_references > 0 {
        eprintln!(
            "warning: {} assignment reference(s) point outside the securities list — \
             possible index drift, left untouched",
            report.summary.foreign_references,
        );
    }
    if dry_run {
        eprintln!("dry run: no files written");
    }

    if !persist_errors.is_empty() {
        return Err(CliError::persist(persist_errors.join("; ")));
    }
    Ok(())
}

fn print_report(
    report: &ReconcileReport,
    json_output: bool,
    output_file: &Option<PathBuf>,
) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::persist(format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json)
            .map_err(|e| CliError::persist(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json}");
    }

    let s = &report.summary;
    for (label, stats) in [
        ("countries", &s.countries),
        ("industries", &s.industries),
        ("top holdings", &s.top_holdings),
    ] {
        eprintln!(
            "{label}: {} created, {} updated, {} removed",
            stats.created, stats.updated, stats.removed,
        );
    }
    if s.skipped_taxonomies > 0 {
        eprintln!("skipped {} unrecognized taxonomy(ies)", s.skipped_taxonomies);
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let data = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::config(format!("cannot read {}: {e}", config_path.display())))?;
    let config = MergeConfig::from_toml(&data).map_err(|e| CliError::config(e.to_string()))?;
    eprintln!(
        "valid: {} industry mapping(s), {} country alias(es), {} reserved prefix(es)",
        config.industry_vocabulary.len(),
        config.country_aliases.len(),
        config.reserved_prefixes.len(),
    );
    Ok(())
}

use foliotax_core::{Instrument, Taxonomy};

use crate::cache::{CacheRecord, ReconciliationCache};
use crate::config::MergeConfig;
use crate::error::EngineError;
use crate::merge::{merge_countries, merge_industries, merge_top_holdings};
use crate::model::{Category, ImportLog, ReconcileReport, ReconcileSummary, ReportMeta};

/// Run one reconciliation over the taxonomy trees.
///
/// `instruments` must be in document order — assignment references encode
/// positions into this list. Taxonomies whose display name matches no
/// recognized category are skipped. The trees are mutated in place; the
/// returned report carries the per-category change counts and the cache
/// record to persist for the next run.
pub fn run(
    config: &MergeConfig,
    instruments: &[Instrument],
    taxonomies: &mut [Taxonomy],
    previous: &CacheRecord,
    log: &mut dyn ImportLog,
) -> Result<ReconcileReport, EngineError> {
    config.validate()?;

    let mut cache = ReconciliationCache::load(previous);
    let mut summary = ReconcileSummary::default();

    for taxonomy in taxonomies.iter_mut() {
        let category = match config.category_of(taxonomy.name()) {
            Some(category) => category,
            None => {
                summary.skipped_taxonomies += 1;
                continue;
            }
        };
        let root = &mut taxonomy.root;
        let (stats, foreign) = match category {
            Category::Countries => merge_countries(config, instruments, root, &mut cache, log),
            Category::Industries => merge_industries(config, instruments, root, &mut cache, log),
            Category::TopHoldings => merge_top_holdings(config, instruments, root, &mut cache, log),
        };
        match category {
            Category::Countries => summary.countries = stats,
            Category::Industries => summary.industries = stats,
            Category::TopHoldings => summary.top_holdings = stats,
        }
        summary.foreign_references += foreign;
    }

    Ok(ReconcileReport {
        meta: ReportMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        cache: cache.snapshot(),
    })
}

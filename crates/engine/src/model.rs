use serde::Serialize;

use crate::cache::CacheRecord;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// The three taxonomy categories the engine reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Countries,
    Industries,
    TopHoldings,
}

impl Category {
    /// Suffix used for per-instrument log files.
    pub fn log_suffix(&self) -> &'static str {
        match self {
            Self::Countries => "countries",
            Self::Industries => "industries",
            Self::TopHoldings => "holdings",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Countries => write!(f, "countries"),
            Self::Industries => write!(f, "industries"),
            Self::TopHoldings => write!(f, "top holdings"),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator interfaces
// ---------------------------------------------------------------------------

/// Logging sink of the tree-persistence collaborator. One text blob per
/// instrument per category, written only when at least one non-zero
/// assignment exists for that instrument in that category.
pub trait ImportLog {
    fn write_log(&mut self, instrument_identifier: &str, category: Category, text: &str);
}

/// Discards all logs. For callers that only want the tree mutation.
pub struct NullLog;

impl ImportLog for NullLog {
    fn write_log(&mut self, _instrument_identifier: &str, _category: Category, _text: &str) {}
}

// ---------------------------------------------------------------------------
// Summary + report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl CategorySummary {
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileSummary {
    pub countries: CategorySummary,
    pub industries: CategorySummary,
    pub top_holdings: CategorySummary,
    /// Taxonomies whose display name matched no recognized category.
    pub skipped_taxonomies: usize,
    /// Assignments whose reference parses to a position outside the current
    /// instrument list. Left untouched; a non-zero count signals index drift
    /// in the document.
    pub foreign_references: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub run_at: String,
}

/// Result of one reconciliation run: what changed, and the cache record to
/// persist for the next run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub meta: ReportMeta,
    pub summary: ReconcileSummary,
    pub cache: CacheRecord,
}

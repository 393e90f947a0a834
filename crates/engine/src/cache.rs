//! Dedup cache of previously applied (identifier, classification, weight)
//! triples.
//!
//! The cache suppresses *reporting* only. Whether an assignment exists in the
//! live tree is decided from current instrument data alone; the cache decides
//! whether an addition is re-logged as newly imported — both across alias
//! names within one run and across consecutive runs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::Category;

/// One applied assignment as persisted in the cache record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub weight: u32,
    pub identifier: String,
    pub classification: String,
}

/// The persisted cache record: one run's net-new assignments per category.
/// Written after each successful reconciliation, read back as the "previous"
/// record at the start of the next run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(default)]
    pub countries: Vec<CacheEntry>,
    #[serde(default)]
    pub industries: Vec<CacheEntry>,
    #[serde(default)]
    pub top_holdings: Vec<CacheEntry>,
}

impl CacheRecord {
    fn list(&self, category: Category) -> &Vec<CacheEntry> {
        match category {
            Category::Countries => &self.countries,
            Category::Industries => &self.industries,
            Category::TopHoldings => &self.top_holdings,
        }
    }

    fn list_mut(&mut self, category: Category) -> &mut Vec<CacheEntry> {
        match category {
            Category::Countries => &mut self.countries,
            Category::Industries => &mut self.industries,
            Category::TopHoldings => &mut self.top_holdings,
        }
    }
}

/// In-memory cache state for one reconciliation run.
pub struct ReconciliationCache {
    seen: BTreeSet<(String, String, u32)>,
    current: CacheRecord,
}

impl ReconciliationCache {
    /// Seed the cache with the previous run's record.
    pub fn load(previous: &CacheRecord) -> Self {
        let mut seen = BTreeSet::new();
        for category in [Category::Countries, Category::Industries, Category::TopHoldings] {
            for entry in previous.list(category) {
                seen.insert((entry.identifier.clone(), entry.classification.clone(), entry.weight));
            }
        }
        Self { seen, current: CacheRecord::default() }
    }

    pub fn contains(&self, identifier: &str, classification: &str, weight: u32) -> bool {
        self.seen
            .contains(&(identifier.to_string(), classification.to_string(), weight))
    }

    /// Record a newly imported assignment into this run's record (and into
    /// the seen-set, so a second alias match with the same weight in the same
    /// run is not reported twice).
    pub fn record(&mut self, category: Category, identifier: &str, classification: &str, weight: u32) {
        self.seen
            .insert((identifier.to_string(), classification.to_string(), weight));
        self.current.list_mut(category).push(CacheEntry {
            weight,
            identifier: identifier.to_string(),
            classification: classification.to_string(),
        });
    }

    /// This run's record, for persistence.
    pub fn snapshot(&self) -> CacheRecord {
        self.current.clone()
    }
}

//! Merges current instrument percentages into the taxonomy trees.
//!
//! Per (category, instrument, node) the outcome is one of: create an
//! assignment (qualifying percentage, none exists), update the weight in
//! place (weight drifted; rank and reference stay), remove the assignment
//! (percentage gone or the name no longer resolves to the node), or no-op.
//! Classification nodes are created lazily and never deleted — a node that
//! loses its last assignment stays in the tree.
//!
//! Assignments are touched only when their reference parses to a position
//! inside the current instrument list. References of a foreign shape are
//! ignored; parseable but out-of-bounds ones are counted as index drift and
//! left alone.

use std::collections::{BTreeMap, BTreeSet};

use foliotax_core::{Assignment, Classification, Instrument};

use crate::cache::ReconciliationCache;
use crate::cluster::cluster;
use crate::config::MergeConfig;
use crate::industry::{best_match, IndustryNormalizer};
use crate::model::{Category, CategorySummary, ImportLog};
use crate::refs;
use crate::similarity::similar;

/// Percentage → integer basis points, rounded up.
fn weight_bps(percent: f64) -> u32 {
    (percent * 100.0).ceil() as u32
}

// ---------------------------------------------------------------------------
// Tree traversal helpers
// ---------------------------------------------------------------------------

/// Pre-order child-index paths of every node below `root`.
fn collect_paths(root: &Classification) -> Vec<Vec<usize>> {
    fn walk(node: &Classification, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        for (i, child) in node.children.iter().enumerate() {
            prefix.push(i);
            out.push(prefix.clone());
            walk(child, prefix, out);
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    walk(root, &mut Vec::new(), &mut out);
    out
}

fn node_at<'a>(root: &'a Classification, path: &[usize]) -> &'a Classification {
    let mut node = root;
    for &i in path {
        node = &node.children[i];
    }
    node
}

fn node_at_mut<'a>(root: &'a mut Classification, path: &[usize]) -> &'a mut Classification {
    let mut node = root;
    for &i in path {
        node = &mut node.children[i];
    }
    node
}

// ---------------------------------------------------------------------------
// Countries / industries (flat categories over an existing tree)
// ---------------------------------------------------------------------------

/// The two categories that reconcile against a pre-existing tree differ only
/// in how instrument-side names map to node names.
enum FlatKind<'a> {
    Countries { config: &'a MergeConfig },
    Industries { config: &'a MergeConfig },
}

impl FlatKind<'_> {
    fn category(&self) -> Category {
        match self {
            Self::Countries { .. } => Category::Countries,
            Self::Industries { .. } => Category::Industries,
        }
    }

    /// The instrument's percentages keyed by taxonomy-side name: country
    /// aliases folded to their canonical spelling, industry labels run
    /// through the normalizer (excluded labels dropped). Duplicates that
    /// collapse onto one name are summed.
    fn target_percents(&self, instrument: &Instrument) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        match self {
            Self::Countries { config } => {
                for (name, percent) in &instrument.countries {
                    let canonical = config.canonical_country(name).to_string();
                    *out.entry(canonical).or_insert(0.0) += percent;
                }
            }
            Self::Industries { config } => {
                let normalizer = IndustryNormalizer::new(
                    &config.industry_vocabulary,
                    &config.industry_overrides,
                );
                for (label, percent) in &instrument.industries {
                    if let Some(normalized) = normalizer.normalize(label, &instrument.identifier) {
                        *out.entry(normalized).or_insert(0.0) += percent;
                    }
                }
            }
        }
        out
    }

    /// Which of the instrument's target entries applies to a node with this
    /// name — exact for countries (after alias folding), exact-then-similar
    /// for industries (taxonomy wording drifts).
    fn target_for_node<'m>(
        &self,
        percents: &'m BTreeMap<String, f64>,
        node_name: &str,
    ) -> Option<(&'m str, f64)> {
        match self {
            Self::Countries { config } => percents
                .get_key_value(config.canonical_country(node_name))
                .map(|(k, v)| (k.as_str(), *v)),
            Self::Industries { .. } => {
                if let Some((k, v)) = percents.get_key_value(node_name) {
                    return Some((k.as_str(), *v));
                }
                percents
                    .iter()
                    .find(|(k, _)| similar(k, node_name))
                    .map(|(k, v)| (k.as_str(), *v))
            }
        }
    }

    /// Existing node for a target name, anywhere below the category root.
    fn find_node_path(&self, root: &Classification, target: &str) -> Option<Vec<usize>> {
        let nodes: Vec<(Vec<usize>, String)> = collect_paths(root)
            .into_iter()
            .map(|path| {
                let name = node_at(root, &path).name.clone();
                (path, name)
            })
            .collect();

        match self {
            Self::Countries { config } => nodes
                .into_iter()
                .find(|(_, name)| config.canonical_country(name) == target)
                .map(|(path, _)| path),
            Self::Industries { .. } => {
                if let Some((path, _)) = nodes.iter().find(|(_, name)| name == target) {
                    return Some(path.clone());
                }
                // tolerate minor wording drift, but only within the usual
                // similarity bound — otherwise a new node is warranted
                let (closest, _) = best_match(nodes.iter().map(|(_, n)| n.as_str()), target)?;
                if similar(target, closest) {
                    let closest = closest.to_string();
                    nodes
                        .into_iter()
                        .find(|(_, name)| *name == closest)
                        .map(|(path, _)| path)
                } else {
                    None
                }
            }
        }
    }
}

pub fn merge_countries(
    config: &MergeConfig,
    instruments: &[Instrument],
    root: &mut Classification,
    cache: &mut ReconciliationCache,
    log: &mut dyn ImportLog,
) -> (CategorySummary, usize) {
    merge_flat(&FlatKind::Countries { config }, instruments, root, cache, log)
}

pub fn merge_industries(
    config: &MergeConfig,
    instruments: &[Instrument],
    root: &mut Classification,
    cache: &mut ReconciliationCache,
    log: &mut dyn ImportLog,
) -> (CategorySummary, usize) {
    merge_flat(&FlatKind::Industries { config }, instruments, root, cache, log)
}

fn merge_flat(
    kind: &FlatKind,
    instruments: &[Instrument],
    root: &mut Classification,
    cache: &mut ReconciliationCache,
    log: &mut dyn ImportLog,
) -> (CategorySummary, usize) {
    let category = kind.category();
    let count = instruments.len();
    let mut stats = CategorySummary::default();
    let mut foreign = 0usize;

    let percents: Vec<BTreeMap<String, f64>> =
        instruments.iter().map(|i| kind.target_percents(i)).collect();
    // target names already satisfied by an existing assignment, per instrument
    let mut covered: Vec<BTreeSet<String>> = vec![BTreeSet::new(); count];

    // Orphan sweep and in-place updates over every existing node. A node may
    // hold a stale assignment from an instrument whose composition changed
    // since the last run.
    for path in collect_paths(root) {
        let node = node_at_mut(root, &path);
        let node_name = node.name.clone();
        let mut seen: BTreeSet<usize> = BTreeSet::new();
        let mut kept = Vec::with_capacity(node.assignments.len());

        for mut assignment in std::mem::take(&mut node.assignments) {
            let Some(pos) = refs::parse_reference_index(&assignment.reference) else {
                kept.push(assignment);
                continue;
            };
            if pos == 0 || pos > count {
                foreign += 1;
                kept.push(assignment);
                continue;
            }
            let idx = pos - 1;
            if !seen.insert(idx) {
                // duplicate assignment for one instrument under one node
                stats.removed += 1;
                continue;
            }
            match kind.target_for_node(&percents[idx], &node_name) {
                Some((key, percent)) if percent > 0.0 => {
                    let weight = weight_bps(percent);
                    if assignment.weight != weight {
                        assignment.weight = weight;
                        stats.updated += 1;
                    }
                    covered[idx].insert(key.to_string());
                    kept.push(assignment);
                }
                _ => stats.removed += 1,
            }
        }
        node.assignments = kept;
    }

    // Create assignments for qualifying percentages not yet in the tree.
    for (idx, instrument) in instruments.iter().enumerate() {
        for (key, percent) in &percents[idx] {
            if *percent <= 0.0 || covered[idx].contains(key) {
                continue;
            }
            let path = match kind.find_node_path(root, key) {
                Some(path) => path,
                None => {
                    root.children.push(Classification::new(key.clone()));
                    vec![root.children.len() - 1]
                }
            };
            let depth = path.len();
            let node = node_at_mut(root, &path);
            if node
                .assignments
                .iter()
                .any(|a| refs::parse_reference_index(&a.reference) == Some(idx + 1))
            {
                continue;
            }
            let weight = weight_bps(*percent);
            let rank = node.next_rank();
            node.assignments.push(Assignment {
                reference: refs::build_reference(depth, idx),
                weight,
                rank,
            });
            let classification = node.name.clone();
            cache.record(category, &instrument.identifier, &classification, weight);
            stats.created += 1;
        }
    }

    for (idx, instrument) in instruments.iter().enumerate() {
        let lines: Vec<String> = percents[idx]
            .iter()
            .filter(|(_, p)| **p > 0.0)
            .map(|(name, p)| format!("{name}: {p:.2} %"))
            .collect();
        if !lines.is_empty() {
            log.write_log(&instrument.identifier, category, &lines.join("\n"));
        }
    }

    (stats, foreign)
}

// ---------------------------------------------------------------------------
// Top holdings (nodes created on demand per clustered name)
// ---------------------------------------------------------------------------

pub fn merge_top_holdings(
    config: &MergeConfig,
    instruments: &[Instrument],
    root: &mut Classification,
    cache: &mut ReconciliationCache,
    log: &mut dyn ImportLog,
) -> (CategorySummary, usize) {
    let count = instruments.len();
    let mut stats = CategorySummary::default();

    let mut foreign = 0usize;
    for child in &root.children {
        for assignment in &child.assignments {
            if let Some(pos) = refs::parse_reference_index(&assignment.reference) {
                if pos == 0 || pos > count {
                    foreign += 1;
                }
            }
        }
    }

    // Seed the clusterer with the existing folder names (document order) so
    // folders keep their spelling across runs and near-duplicate spellings
    // from the instruments fold into them as aliases.
    let mut seeds: Vec<String> = root.children.iter().map(|c| c.name.clone()).collect();
    for instrument in instruments.iter().filter(|i| i.kind.is_basket()) {
        seeds.extend(instrument.holdings.keys().cloned());
    }
    let clusters = cluster(seeds, &config.reserved_prefixes);

    let mut log_lines: Vec<Vec<String>> = vec![Vec::new(); count];

    for (canonical, aliases) in &clusters {
        let mut members: Vec<&str> = Vec::with_capacity(aliases.len() + 1);
        members.push(canonical);
        members.extend(aliases.iter().map(String::as_str));

        for (idx, instrument) in instruments.iter().enumerate() {
            // one entry per member name the instrument holds a position in;
            // only baskets carry a holdings breakdown
            let desired: Vec<(&str, u32, f64)> = if instrument.kind.is_basket() {
                members
                    .iter()
                    .filter_map(|name| {
                        instrument
                            .holdings
                            .get(*name)
                            .copied()
                            .filter(|p| *p > 0.0)
                            .map(|p| (*name, weight_bps(p), p))
                    })
                    .collect()
            } else {
                Vec::new()
            };

            let node_pos = root.children.iter().position(|c| c.name == *canonical);
            if desired.is_empty() && node_pos.is_none() {
                continue;
            }
            let node_pos = node_pos.unwrap_or_else(|| {
                root.children.push(holding_node(canonical));
                root.children.len() - 1
            });
            let node = &mut root.children[node_pos];

            let mut existing: Vec<usize> = node
                .assignments
                .iter()
                .enumerate()
                .filter(|(_, a)| refs::parse_reference_index(&a.reference) == Some(idx + 1))
                .map(|(i, _)| i)
                .collect();
            existing.sort_by_key(|&i| node.assignments[i].rank);

            let paired = existing.len().min(desired.len());
            for k in 0..paired {
                let weight = desired[k].1;
                let assignment = &mut node.assignments[existing[k]];
                if assignment.weight != weight {
                    assignment.weight = weight;
                    stats.updated += 1;
                }
            }
            for &(_, weight, _) in &desired[paired..] {
                let rank = node.next_rank();
                node.assignments.push(Assignment {
                    reference: refs::build_reference(1, idx),
                    weight,
                    rank,
                });
                stats.created += 1;
                // live assignment is created either way; the cache only
                // suppresses re-reporting (same weight under another alias,
                // or an addition already applied in a previous run)
                if !cache.contains(&instrument.identifier, canonical, weight) {
                    cache.record(Category::TopHoldings, &instrument.identifier, canonical, weight);
                }
            }
            if desired.len() < existing.len() {
                let mut stale: Vec<usize> = existing[desired.len()..].to_vec();
                stale.sort_unstable_by(|a, b| b.cmp(a));
                for i in stale {
                    node.assignments.remove(i);
                    stats.removed += 1;
                }
            }

            for (name, _, percent) in &desired {
                log_lines[idx].push(format!("{name}: {percent:.2} %"));
            }
        }
    }

    // Folders whose name is now an alias of another cluster: current data
    // lives under the canonical node, so their instrument-list assignments
    // are superseded. The folder itself stays in place, merely empty.
    for child in &mut root.children {
        if clusters.contains_key(&child.name) {
            continue;
        }
        let before = child.assignments.len();
        child.assignments.retain(|a| match refs::parse_reference_index(&a.reference) {
            None => true,
            Some(pos) if pos == 0 || pos > count => true,
            Some(_) => false,
        });
        stats.removed += before - child.assignments.len();
    }

    for (idx, instrument) in instruments.iter().enumerate() {
        if !log_lines[idx].is_empty() {
            log.write_log(
                &instrument.identifier,
                Category::TopHoldings,
                &log_lines[idx].join("\n"),
            );
        }
    }

    (stats, foreign)
}

fn holding_node(name: &str) -> Classification {
    let mut node = Classification::new(name);
    node.color = Some(random_color());
    node
}

fn random_color() -> String {
    format!("#{:06x}", rand::random::<u32>() & 0x00ff_ffff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheRecord;
    use crate::model::NullLog;
    use foliotax_core::InstrumentKind;

    fn basket(identifier: &str, name: &str) -> Instrument {
        Instrument::new(identifier, name, InstrumentKind::Basket)
    }

    fn fresh_cache() -> ReconciliationCache {
        ReconciliationCache::load(&CacheRecord::default())
    }

    // ── countries ──────────────────────────────────────────────────

    #[test]
    fn creates_assignment_with_ceiled_weight() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.countries.insert("USA".into(), 2.345);
        let mut root = Classification::new("Regionen");
        let mut cache = fresh_cache();

        let (stats, foreign) =
            merge_countries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.created, 1);
        assert_eq!(foreign, 0);
        let usa = root.child("USA").unwrap();
        assert_eq!(usa.assignments.len(), 1);
        assert_eq!(usa.assignments[0].weight, 235); // ceil(2.345 * 100)
        assert_eq!(usa.assignments[0].rank, 1);
        assert_eq!(usa.assignments[0].reference, "../../../../securities/security");
    }

    #[test]
    fn reuses_existing_node_and_updates_weight_in_place() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.countries.insert("USA".into(), 30.0);
        let mut root = Classification::new("Regionen");
        let mut usa = Classification::new("USA");
        usa.assignments.push(Assignment {
            reference: refs::build_reference(1, 0),
            weight: 2780,
            rank: 4,
        });
        root.children.push(usa);
        let mut cache = fresh_cache();

        let (stats, _) = merge_countries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.created, 0);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.removed, 0);
        let usa = root.child("USA").unwrap();
        assert_eq!(usa.assignments[0].weight, 3000);
        assert_eq!(usa.assignments[0].rank, 4, "rank must not change on update");
    }

    #[test]
    fn unchanged_weight_is_a_noop() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.countries.insert("USA".into(), 27.8);
        let mut root = Classification::new("Regionen");
        let mut usa = Classification::new("USA");
        usa.assignments.push(Assignment {
            reference: refs::build_reference(1, 0),
            weight: 2780,
            rank: 1,
        });
        root.children.push(usa);
        let mut cache = fresh_cache();

        let (stats, _) = merge_countries(&config, &[inst], &mut root, &mut cache, &mut NullLog);
        assert!(stats.is_empty());
        assert!(cache.snapshot().countries.is_empty());
    }

    #[test]
    fn orphan_assignment_is_removed_but_node_remains() {
        let config = MergeConfig::default();
        let inst = basket("IE00B4L5Y983", "iShares Core MSCI World"); // no countries
        let mut root = Classification::new("Regionen");
        let mut usa = Classification::new("USA");
        usa.assignments.push(Assignment {
            reference: refs::build_reference(1, 0),
            weight: 2780,
            rank: 1,
        });
        root.children.push(usa);
        let mut cache = fresh_cache();

        let (stats, _) = merge_countries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.removed, 1);
        let usa = root.child("USA").unwrap();
        assert!(usa.assignments.is_empty());
    }

    #[test]
    fn country_alias_folds_onto_existing_node() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.countries.insert("Vereinigte Staaten".into(), 27.8);
        let mut root = Classification::new("Regionen");
        root.children.push(Classification::new("USA"));
        let mut cache = fresh_cache();

        let (stats, _) = merge_countries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.created, 1);
        assert_eq!(root.children.len(), 1, "no second node for the alias spelling");
        assert_eq!(root.child("USA").unwrap().assignments.len(), 1);
    }

    #[test]
    fn nested_country_node_gets_deeper_reference() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.countries.insert("USA".into(), 27.8);
        let mut root = Classification::new("Regionen");
        let mut america = Classification::new("Amerika");
        america.children.push(Classification::new("USA"));
        root.children.push(america);
        let mut cache = fresh_cache();

        merge_countries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        let usa = root.child("Amerika").unwrap().child("USA").unwrap();
        assert_eq!(usa.assignments.len(), 1);
        // depth 2 below the category root
        assert_eq!(usa.assignments[0].reference, "../../../../../securities/security");
    }

    #[test]
    fn foreign_and_out_of_bounds_references_are_left_alone() {
        let config = MergeConfig::default();
        let inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        let mut root = Classification::new("Regionen");
        let mut usa = Classification::new("USA");
        usa.assignments.push(Assignment {
            reference: "../../accounts/account[1]".into(),
            weight: 1,
            rank: 1,
        });
        usa.assignments.push(Assignment {
            reference: refs::build_reference(1, 7), // position 8 of a 1-instrument list
            weight: 2,
            rank: 2,
        });
        root.children.push(usa);
        let mut cache = fresh_cache();

        let (stats, foreign) =
            merge_countries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.removed, 0);
        assert_eq!(foreign, 1);
        assert_eq!(root.child("USA").unwrap().assignments.len(), 2);
    }

    #[test]
    fn second_run_is_idempotent() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.countries.insert("USA".into(), 27.8);
        inst.countries.insert("Japan".into(), 6.1);
        let mut root = Classification::new("Regionen");
        let mut cache = fresh_cache();
        merge_countries(&config, std::slice::from_ref(&inst), &mut root, &mut cache, &mut NullLog);
        let after_first = root.clone();

        let (stats, _) = merge_countries(
            &config,
            std::slice::from_ref(&inst),
            &mut root,
            &mut cache,
            &mut NullLog,
        );

        assert!(stats.is_empty());
        assert_eq!(root, after_first);
    }

    // ── industries ─────────────────────────────────────────────────

    #[test]
    fn industry_label_is_normalized_before_matching() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.industries.insert("Technologie".into(), 22.5);
        let mut root = Classification::new("Branchen (GICS)");
        root.children.push(Classification::new("Informationstechnologie"));
        let mut cache = fresh_cache();

        let (stats, _) = merge_industries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.created, 1);
        assert_eq!(root.children.len(), 1);
        assert_eq!(
            root.child("Informationstechnologie").unwrap().assignments[0].weight,
            2250
        );
    }

    #[test]
    fn excluded_industry_label_is_skipped() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.industries.insert("Sonstige".into(), 3.0);
        let mut root = Classification::new("Branchen (GICS)");
        let mut cache = fresh_cache();

        let (stats, _) = merge_industries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert!(stats.is_empty());
        assert!(root.children.is_empty());
    }

    #[test]
    fn industry_wording_drift_reuses_closest_node() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.industries.insert("Gesundheitswesen".into(), 12.0);
        let mut root = Classification::new("Branchen (GICS)");
        // tree spells it slightly differently
        root.children.push(Classification::new("Gesundheitswesen / Pharma"));
        let mut cache = fresh_cache();

        let (stats, _) = merge_industries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.created, 1);
        assert_eq!(root.children.len(), 1, "drifted wording must not spawn a new node");
        assert_eq!(
            root.child("Gesundheitswesen / Pharma").unwrap().assignments.len(),
            1
        );
    }

    #[test]
    fn reclassified_industry_moves_assignment() {
        let config = MergeConfig::default();
        let mut inst = basket("IE00B4L5Y983", "iShares Core MSCI World");
        inst.industries.insert("Energie".into(), 8.0);
        let mut root = Classification::new("Branchen (GICS)");
        let mut financials = Classification::new("Finanzwesen");
        financials.assignments.push(Assignment {
            reference: refs::build_reference(1, 0),
            weight: 800,
            rank: 1,
        });
        root.children.push(financials);
        let mut cache = fresh_cache();

        let (stats, _) = merge_industries(&config, &[inst], &mut root, &mut cache, &mut NullLog);

        // old home emptied, new node created
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.created, 1);
        assert!(root.child("Finanzwesen").unwrap().assignments.is_empty());
        assert_eq!(root.child("Energie").unwrap().assignments.len(), 1);
    }

    // ── top holdings ───────────────────────────────────────────────

    #[test]
    fn holdings_cluster_aliases_under_one_node() {
        let config = MergeConfig::default();
        let mut etf_a = basket("IE00B4L5Y983", "iShares Core MSCI World");
        etf_a.holdings.insert("Alphabet A (Google)".into(), 2.1);
        let mut etf_b = basket("LU0274208692", "Xtrackers MSCI World");
        etf_b.holdings.insert("Alphabet Inc.".into(), 2.3);
        let mut root = Classification::new("Top Ten");
        let mut cache = fresh_cache();

        let (stats, _) = merge_top_holdings(
            &config,
            &[etf_a, etf_b],
            &mut root,
            &mut cache,
            &mut NullLog,
        );

        assert_eq!(stats.created, 2);
        assert_eq!(root.children.len(), 1);
        let node = &root.children[0];
        assert_eq!(node.name, "Alphabet A (Google)");
        assert!(node.color.is_some(), "auto-generated folders carry a color");
        assert_eq!(node.assignments.len(), 2);
        assert_eq!(node.assignments[0].reference, "../../../../securities/security");
        assert_eq!(node.assignments[1].reference, "../../../../securities/security[2]");
    }

    #[test]
    fn instrument_can_appear_once_per_alias_under_one_node() {
        let config = MergeConfig::default();
        let mut etf = basket("IE00B4L5Y983", "iShares Core MSCI World");
        etf.holdings.insert("Alphabet A (Google)".into(), 2.1);
        etf.holdings.insert("Alphabet C (Google)".into(), 1.9);
        let mut root = Classification::new("Top Ten");
        let mut cache = fresh_cache();

        let (stats, _) =
            merge_top_holdings(&config, &[etf], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.created, 2);
        let node = &root.children[0];
        assert_eq!(node.assignments.len(), 2);
        assert_eq!(node.assignments[0].rank, 1);
        assert_eq!(node.assignments[1].rank, 2);
        // both reference the same instrument
        for a in &node.assignments {
            assert_eq!(refs::parse_reference_index(&a.reference), Some(1));
        }
    }

    #[test]
    fn same_weight_aliases_report_once_but_both_exist() {
        let config = MergeConfig::default();
        let mut etf = basket("IE00B4L5Y983", "iShares Core MSCI World");
        etf.holdings.insert("Alphabet A (Google)".into(), 2.0);
        etf.holdings.insert("Alphabet C (Google)".into(), 2.0);
        let mut root = Classification::new("Top Ten");
        let mut cache = fresh_cache();

        merge_top_holdings(&config, &[etf], &mut root, &mut cache, &mut NullLog);

        assert_eq!(root.children[0].assignments.len(), 2, "live tree keeps both");
        assert_eq!(cache.snapshot().top_holdings.len(), 1, "report dedups equal weights");
    }

    #[test]
    fn previously_reported_holding_is_not_reported_again() {
        let config = MergeConfig::default();
        let mut etf = basket("IE00B4L5Y983", "iShares Core MSCI World");
        etf.holdings.insert("Apple Inc.".into(), 5.12);
        let previous = CacheRecord {
            top_holdings: vec![crate::cache::CacheEntry {
                weight: 512,
                identifier: "IE00B4L5Y983".into(),
                classification: "Apple Inc.".into(),
            }],
            ..Default::default()
        };
        let mut cache = ReconciliationCache::load(&previous);
        let mut root = Classification::new("Top Ten");

        let (stats, _) =
            merge_top_holdings(&config, &[etf], &mut root, &mut cache, &mut NullLog);

        // the live assignment is still created — suppression is report-only
        assert_eq!(stats.created, 1);
        assert_eq!(root.children[0].assignments.len(), 1);
        assert!(cache.snapshot().top_holdings.is_empty());
    }

    #[test]
    fn brand_exempt_holdings_get_separate_folders() {
        let config = MergeConfig::default();
        let mut fund = basket("DE0008474024", "Dachfonds Global");
        fund.holdings.insert("iShares Core MSCI World".into(), 40.0);
        fund.holdings.insert("iShares Core MSCI EM".into(), 20.0);
        let mut root = Classification::new("Top Ten");
        let mut cache = fresh_cache();

        merge_top_holdings(&config, &[fund], &mut root, &mut cache, &mut NullLog);

        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn dropped_holding_is_removed_and_folder_stays() {
        let config = MergeConfig::default();
        let mut etf = basket("IE00B4L5Y983", "iShares Core MSCI World");
        etf.holdings.insert("Apple Inc.".into(), 5.0);
        let mut root = Classification::new("Top Ten");
        let mut cache = fresh_cache();
        merge_top_holdings(
            &config,
            std::slice::from_ref(&etf),
            &mut root,
            &mut cache,
            &mut NullLog,
        );

        etf.holdings.clear();
        let (stats, _) =
            merge_top_holdings(&config, &[etf], &mut root, &mut cache, &mut NullLog);

        assert_eq!(stats.removed, 1);
        assert_eq!(root.children.len(), 1, "empty folder is left in place");
        assert!(root.children[0].assignments.is_empty());
    }

    #[test]
    fn existing_folder_name_stays_canonical_across_runs() {
        let config = MergeConfig::default();
        let mut etf = basket("IE00B4L5Y983", "iShares Core MSCI World");
        etf.holdings.insert("Apple Inc".into(), 5.0);
        let mut root = Classification::new("Top Ten");
        root.children.push(Classification::new("Apple Inc."));
        let mut cache = fresh_cache();

        merge_top_holdings(&config, &[etf], &mut root, &mut cache, &mut NullLog);

        // the folder keeps the document's spelling; the holding folds in
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "Apple Inc.");
        assert_eq!(root.children[0].assignments.len(), 1);
    }

    #[test]
    fn single_instruments_do_not_contribute_holdings() {
        let config = MergeConfig::default();
        let mut stock = Instrument::new("US0378331005", "Apple Inc.", InstrumentKind::Single);
        stock.holdings.insert("Apple Inc.".into(), 100.0);
        let mut root = Classification::new("Top Ten");
        let mut cache = fresh_cache();

        let (stats, _) =
            merge_top_holdings(&config, &[stock], &mut root, &mut cache, &mut NullLog);

        assert!(stats.is_empty());
        assert!(root.children.is_empty());
    }

    #[test]
    fn holdings_second_run_is_idempotent() {
        let config = MergeConfig::default();
        let mut etf_a = basket("IE00B4L5Y983", "iShares Core MSCI World");
        etf_a.holdings.insert("Apple Inc.".into(), 5.1);
        etf_a.holdings.insert("Microsoft Corp.".into(), 4.6);
        let mut etf_b = basket("LU0274208692", "Xtrackers MSCI World");
        etf_b.holdings.insert("Apple Inc".into(), 4.9);
        let instruments = [etf_a, etf_b];
        let mut root = Classification::new("Top Ten");
        let mut cache = fresh_cache();
        merge_top_holdings(&config, &instruments, &mut root, &mut cache, &mut NullLog);
        let after_first = root.clone();

        let (stats, _) =
            merge_top_holdings(&config, &instruments, &mut root, &mut cache, &mut NullLog);

        assert!(stats.is_empty());
        assert_eq!(root, after_first);
    }
}

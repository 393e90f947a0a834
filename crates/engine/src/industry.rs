//! Translates provider industry labels into the taxonomy vocabulary.

use std::collections::BTreeMap;

/// Vocabulary translation over immutable configuration tables.
///
/// Per-identifier overrides correct known provider misclassifications and are
/// applied before the table lookup; the corrected label then goes through the
/// vocabulary like any other. A table entry mapping to the empty string marks
/// a label with no taxonomy equivalent (catch-all "Sonstige"-style buckets) —
/// `normalize` returns `None` for those and callers skip the classification.
/// Labels absent from the table pass through unchanged.
pub struct IndustryNormalizer<'a> {
    vocabulary: &'a BTreeMap<String, String>,
    /// identifier → (provider label → corrected label)
    overrides: &'a BTreeMap<String, BTreeMap<String, String>>,
}

impl<'a> IndustryNormalizer<'a> {
    pub fn new(
        vocabulary: &'a BTreeMap<String, String>,
        overrides: &'a BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self { vocabulary, overrides }
    }

    /// Reduce a provider label to a taxonomy-compatible label, or `None` when
    /// the label is excluded from classification.
    pub fn normalize(&self, provider_label: &str, instrument_identifier: &str) -> Option<String> {
        let label = self
            .overrides
            .get(instrument_identifier)
            .and_then(|rules| rules.get(provider_label))
            .map(String::as_str)
            .unwrap_or(provider_label);

        match self.vocabulary.get(label) {
            Some(mapped) if mapped.is_empty() => None,
            Some(mapped) => Some(mapped.clone()),
            None => Some(label.to_string()),
        }
    }
}

/// The candidate with minimum Levenshtein distance to `label`.
///
/// Ties break toward the earlier candidate in iteration order (an explicit
/// fold — `Iterator::min_by_key` would keep the last minimum). Used to
/// tolerate minor wording drift between the tree's node names and the
/// provider vocabulary.
pub fn best_match<'c>(
    candidates: impl IntoIterator<Item = &'c str>,
    label: &str,
) -> Option<(&'c str, usize)> {
    let mut best: Option<(&'c str, usize)> = None;
    for candidate in candidates {
        let distance = strsim::levenshtein(candidate, label);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best
}

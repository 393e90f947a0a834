//! Groups raw names denoting the same entity into canonical-name clusters.

use std::collections::BTreeMap;

use crate::similarity::{is_brand_exempt, similar};

/// Cluster names into a sorted map of canonical name → aliases.
///
/// Deterministic given input order: the first-seen spelling of an entity
/// becomes the canonical key; later near-duplicates are appended to its alias
/// list. Existing canonical keys are scanned in map (sorted) order and the
/// first similar key wins. Brand-exempt names (see
/// [`crate::similarity::is_brand_exempt`]) never fold into an existing
/// cluster. Exact repeats of an already-clustered name are ignored.
///
/// The sorted key order of the returned map is part of the contract —
/// consumers iterate it for deterministic merge results.
pub fn cluster(
    names: impl IntoIterator<Item = String>,
    reserved_prefixes: &[String],
) -> BTreeMap<String, Vec<String>> {
    let mut clusters: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in names {
        if clusters.contains_key(&name)
            || clusters.values().any(|aliases| aliases.contains(&name))
        {
            continue;
        }

        if clusters.is_empty() || is_brand_exempt(&name, reserved_prefixes) {
            clusters.insert(name, Vec::new());
            continue;
        }

        let target = clusters.keys().find(|key| similar(&name, key)).cloned();
        match target {
            Some(key) => clusters.get_mut(&key).unwrap().push(name),
            None => {
                clusters.insert(name, Vec::new());
            }
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(names: &[&str]) -> BTreeMap<String, Vec<String>> {
        cluster(names.iter().map(|s| s.to_string()), &[])
    }

    #[test]
    fn first_seen_becomes_canonical() {
        let clusters = run(&["SAP", "SAP SE", "Allianz"]);
        let keys: Vec<&String> = clusters.keys().collect();
        assert_eq!(keys, ["Allianz", "SAP"]);
        assert!(clusters["Allianz"].is_empty());
        assert_eq!(clusters["SAP"], ["SAP SE"]);
    }

    #[test]
    fn unrelated_names_stay_apart() {
        let clusters = run(&["AXA", "ABB", "BMW"]);
        assert_eq!(clusters.len(), 3);
    }

    #[test]
    fn exact_repeats_are_ignored() {
        let clusters = run(&["Apple Inc.", "Apple Inc.", "Apple Inc."]);
        assert_eq!(clusters.len(), 1);
        assert!(clusters["Apple Inc."].is_empty());
    }

    #[test]
    fn repeat_of_alias_is_ignored() {
        let clusters = run(&["Apple Inc.", "Apple Inc", "Apple Inc"]);
        assert_eq!(clusters["Apple Inc."], ["Apple Inc"]);
    }

    #[test]
    fn brand_exempt_names_never_merge() {
        let reserved = vec!["iShares".to_string()];
        let clusters = cluster(
            [
                "iShares Core MSCI World".to_string(),
                "iShares Core MSCI EM".to_string(),
            ],
            &reserved,
        );
        assert_eq!(clusters.len(), 2, "sibling fund products must not be folded");
    }

    #[test]
    fn aliases_accumulate_in_input_order() {
        let clusters = run(&["Alphabet A (Google)", "Alphabet C (Google)", "Alphabet Inc."]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters["Alphabet A (Google)"],
            ["Alphabet C (Google)", "Alphabet Inc."]
        );
    }
}

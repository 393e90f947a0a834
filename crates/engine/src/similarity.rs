//! Edit-distance equivalence test between two display names.
//!
//! Provider feeds and hand-maintained documents spell the same company in
//! several ways ("Alphabet A (Google)" vs "Alphabet Inc."). Two names are
//! treated as the same entity when their Levenshtein distance is small AND
//! they agree on a long common prefix — the prefix requirement rejects short,
//! unrelated names with coincidentally low distance ("AXA" vs "ABB").

/// Names further apart than this are never similar.
const MAX_EDIT_DISTANCE: usize = 15;

/// Diverging names must share at least this many leading characters.
const MIN_SHARED_PREFIX: usize = 8;

/// Case-insensitive similarity check.
///
/// - distance 0 → similar (identical modulo case)
/// - distance > 15 → not similar
/// - one name a case-insensitive prefix of the other ("SAP" / "SAP SE") → similar
/// - otherwise similar iff the names share an 8-character common prefix
pub fn similar(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let distance = strsim::levenshtein(&a, &b);
    if distance == 0 {
        return true;
    }
    if distance > MAX_EDIT_DISTANCE {
        return false;
    }
    let diverge_at = first_difference(&a, &b);
    let shorter = a.chars().count().min(b.chars().count());
    if shorter <= diverge_at {
        // one name is a prefix of the other
        return true;
    }
    diverge_at >= MIN_SHARED_PREFIX
}

/// Index (in chars) of the first position where the two strings differ.
/// Returns the shorter length when one is a prefix of the other.
fn first_difference(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// True if `name` starts with one of the reserved brand prefixes
/// (case-insensitive). Fund families share a sponsor prefix across many
/// legitimately distinct products, so such names are never folded into an
/// existing cluster — they always start their own canonical entry.
pub fn is_brand_exempt(name: &str, reserved_prefixes: &[String]) -> bool {
    let lower = name.to_lowercase();
    reserved_prefixes.iter().any(|p| lower.starts_with(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_similar() {
        for s in ["SAP", "Allianz SE", "Alphabet A (Google)"] {
            assert!(similar(s, s), "{s} must be similar to itself");
        }
    }

    #[test]
    fn case_only_difference_is_similar() {
        assert!(similar("allianz", "ALLIANZ"));
    }

    #[test]
    fn prefix_rule() {
        assert!(similar("SAP", "SAP SE"));
        assert!(similar("SAP SE", "SAP"));
    }

    #[test]
    fn short_unrelated_names_are_not_similar() {
        assert!(!similar("AXA", "ABB"));
        assert!(!similar("BMW", "BNP"));
    }

    #[test]
    fn long_names_diverging_late_are_similar() {
        assert!(similar("Alphabet A (Google)", "Alphabet Inc."));
        assert!(similar("Samsung Electronics Co Ltd", "Samsung Electronics GDR"));
    }

    #[test]
    fn large_distance_is_not_similar() {
        assert!(!similar("Deutsche Telekom AG", "Berkshire Hathaway Inc. B"));
    }

    #[test]
    fn first_difference_counts_common_prefix() {
        assert_eq!(first_difference("alphabet a", "alphabet inc"), 9);
        assert_eq!(first_difference("axa", "abb"), 1);
        assert_eq!(first_difference("sap", "sap se"), 3);
    }

    #[test]
    fn brand_exempt_matches_prefix_case_insensitively() {
        let reserved = vec!["iShares".to_string(), "Xtrackers".to_string()];
        assert!(is_brand_exempt("iShares Core MSCI World", &reserved));
        assert!(is_brand_exempt("ISHARES S&P 500", &reserved));
        assert!(!is_brand_exempt("Vanguard FTSE All-World", &reserved));
    }
}

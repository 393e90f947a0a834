use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::EngineError;
use crate::model::Category;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Behavior tables of the reconciliation engine.
///
/// Everything here is data, not code: category recognition names, the
/// provider→taxonomy industry vocabulary, per-identifier correction rules,
/// country aliases, and the reserved brand prefixes. Built-in defaults cover
/// the stock document layout; a TOML file overrides any field selectively.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Display names recognized as the countries category.
    #[serde(default = "default_country_categories")]
    pub country_categories: Vec<String>,
    /// Display names recognized as the industries category.
    #[serde(default = "default_industry_categories")]
    pub industry_categories: Vec<String>,
    /// Display names recognized as the top-holdings category.
    #[serde(default = "default_holding_categories")]
    pub holding_categories: Vec<String>,
    /// Legacy or provider spellings of country names → canonical node name.
    #[serde(default = "default_country_aliases")]
    pub country_aliases: BTreeMap<String, String>,
    /// Provider industry label → taxonomy label. Empty string excludes.
    #[serde(default = "default_industry_vocabulary")]
    pub industry_vocabulary: BTreeMap<String, String>,
    /// identifier → (provider label → corrected label), applied before the
    /// vocabulary lookup. Corrections for known provider misclassifications.
    #[serde(default)]
    pub industry_overrides: BTreeMap<String, BTreeMap<String, String>>,
    /// Brand prefixes whose products are never name-merged.
    #[serde(default = "default_reserved_prefixes")]
    pub reserved_prefixes: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            country_categories: default_country_categories(),
            industry_categories: default_industry_categories(),
            holding_categories: default_holding_categories(),
            country_aliases: default_country_aliases(),
            industry_vocabulary: default_industry_vocabulary(),
            industry_overrides: BTreeMap::new(),
            reserved_prefixes: default_reserved_prefixes(),
        }
    }
}

impl MergeConfig {
    pub fn from_toml(s: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(s).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Category recognition is by exact display-name match. Unrecognized
    /// taxonomy names return `None` and are skipped by the engine.
    pub fn category_of(&self, taxonomy_name: &str) -> Option<Category> {
        if self.country_categories.iter().any(|n| n == taxonomy_name) {
            Some(Category::Countries)
        } else if self.industry_categories.iter().any(|n| n == taxonomy_name) {
            Some(Category::Industries)
        } else if self.holding_categories.iter().any(|n| n == taxonomy_name) {
            Some(Category::TopHoldings)
        } else {
            None
        }
    }

    /// Canonical spelling of a country name after alias normalization.
    pub fn canonical_country<'a>(&'a self, name: &'a str) -> &'a str {
        self.country_aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for names in [
            &self.country_categories,
            &self.industry_categories,
            &self.holding_categories,
        ] {
            if names.is_empty() {
                return Err(EngineError::ConfigValidation(
                    "each category needs at least one recognized name".into(),
                ));
            }
        }

        let mut all: Vec<&String> = Vec::new();
        all.extend(&self.country_categories);
        all.extend(&self.industry_categories);
        all.extend(&self.holding_categories);
        for (i, name) in all.iter().enumerate() {
            if all[..i].contains(name) {
                return Err(EngineError::ConfigValidation(format!(
                    "category name '{name}' is assigned to more than one category"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

fn default_country_categories() -> Vec<String> {
    vec!["Regionen".into(), "Länder".into()]
}

fn default_industry_categories() -> Vec<String> {
    vec!["Branchen (GICS)".into(), "Branchen".into()]
}

fn default_holding_categories() -> Vec<String> {
    vec!["Top Ten".into(), "Unternehmensgewichtung".into()]
}

fn default_country_aliases() -> BTreeMap<String, String> {
    [
        ("Vereinigte Staaten", "USA"),
        ("Vereinigte Staaten von Amerika", "USA"),
        ("Grossbritannien", "Großbritannien"),
        ("Vereinigtes Königreich", "Großbritannien"),
        ("Tschechische Republik", "Tschechien"),
        ("Südkorea", "Korea"),
        ("Republik Korea", "Korea"),
        ("Holland", "Niederlande"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_industry_vocabulary() -> BTreeMap<String, String> {
    [
        // provider sector wording → GICS wording used by the tree
        ("Technologie", "Informationstechnologie"),
        ("IT", "Informationstechnologie"),
        ("Finanzen", "Finanzwesen"),
        ("Banken", "Finanzwesen"),
        ("Zyklische Konsumgüter", "Nicht-Basiskonsumgüter"),
        ("Nichtzyklische Konsumgüter", "Basiskonsumgüter"),
        ("Konsumgüter", "Basiskonsumgüter"),
        ("Öl & Gas", "Energie"),
        ("Rohstoffe", "Roh-, Hilfs- & Betriebsstoffe"),
        ("Grundstoffe", "Roh-, Hilfs- & Betriebsstoffe"),
        ("Telekommunikation", "Kommunikationsdienste"),
        ("Medien", "Kommunikationsdienste"),
        ("Industriegüter", "Industrie"),
        ("Immobilienwerte", "Immobilien"),
        // catch-all buckets with no taxonomy equivalent
        ("Sonstige", ""),
        ("Sonstige Branchen", ""),
        ("Diverse", ""),
        ("Fonds", ""),
        ("Barmittel", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_reserved_prefixes() -> Vec<String> {
    ["iShares", "Xtrackers", "Lyxor", "Amundi", "Vanguard", "SPDR", "WisdomTree", "Invesco"]
        .into_iter()
        .map(String::from)
        .collect()
}

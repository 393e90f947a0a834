use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether a security is a composite vehicle or a single holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Fund or ETF: carries a top-holdings breakdown of its own.
    Basket,
    /// Single stock or bond.
    Single,
}

impl InstrumentKind {
    pub fn is_basket(&self) -> bool {
        matches!(self, Self::Basket)
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basket => write!(f, "basket"),
            Self::Single => write!(f, "single"),
        }
    }
}

/// One instrument as the engine sees it: identity plus the three percentage
/// breakdowns supplied by the data provider.
///
/// Percentages are in [0, 100] and independent per map (they need not sum to
/// 100). The struct is immutable during reconciliation; position in the run's
/// instrument list — not the identifier — is what assignment references
/// encode, so the list order must match the document's securities order.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub identifier: String,
    pub name: String,
    pub kind: InstrumentKind,
    /// holding name → percentage of the instrument's assets.
    pub holdings: BTreeMap<String, f64>,
    /// industry label (provider vocabulary) → percentage.
    pub industries: BTreeMap<String, f64>,
    /// country name → percentage.
    pub countries: BTreeMap<String, f64>,
}

impl Instrument {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>, kind: InstrumentKind) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            kind,
            holdings: BTreeMap::new(),
            industries: BTreeMap::new(),
            countries: BTreeMap::new(),
        }
    }
}

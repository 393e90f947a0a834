//! `foliotax-core` — Core types shared by the engine and the I/O layer.
//!
//! Holds the portfolio document model (securities, taxonomy tree,
//! assignments) and the instrument records the engine consumes. No logic
//! beyond small accessors; the reconciliation rules live in
//! `foliotax-engine`.

pub mod instrument;
pub mod tree;

pub use instrument::{Instrument, InstrumentKind};
pub use tree::{Assignment, Classification, PortfolioDocument, Security, Taxonomy};

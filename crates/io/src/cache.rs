//! Cache record persistence.
//!
//! The record is a small JSON document with three lists of
//! `{weight, identifier, classification}` triples — one run's net-new
//! assignments per category. A missing file loads as the empty record: the
//! first run has nothing to suppress.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use foliotax_engine::cache::CacheRecord;

use crate::error::StoreError;

pub fn load(path: &Path) -> Result<CacheRecord, StoreError> {
    if !path.exists() {
        return Ok(CacheRecord::default());
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Io(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&data).map_err(|e| StoreError::Json(e.to_string()))
}

pub fn save(record: &CacheRecord, path: &Path) -> Result<(), StoreError> {
    let file = File::create(path)
        .map_err(|e| StoreError::Io(format!("cannot create {}: {e}", path.display())))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, record).map_err(|e| StoreError::Json(e.to_string()))
}

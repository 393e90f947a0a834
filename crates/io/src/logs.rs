//! Per-instrument import log files.

use std::path::PathBuf;

use foliotax_engine::model::{Category, ImportLog};

/// Writes one `<identifier>.<category>.log` file per instrument per category
/// into a directory. Write failures are collected instead of raised — a
/// failed log file must not abort or corrupt an otherwise finished
/// reconciliation; the caller reports them afterwards.
pub struct FileImportLog {
    dir: PathBuf,
    errors: Vec<String>,
}

impl FileImportLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), errors: Vec::new() }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl ImportLog for FileImportLog {
    fn write_log(&mut self, instrument_identifier: &str, category: Category, text: &str) {
        let path = self
            .dir
            .join(format!("{instrument_identifier}.{}.log", category.log_suffix()));
        let mut content = text.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        if let Err(e) = std::fs::write(&path, content) {
            self.errors.push(format!("cannot write {}: {e}", path.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_one_file_per_instrument_and_category() {
        let dir = tempdir().unwrap();
        let mut log = FileImportLog::new(dir.path());
        log.write_log("IE00B4L5Y983", Category::Countries, "USA: 27.80 %");
        log.write_log("IE00B4L5Y983", Category::TopHoldings, "Apple Inc.: 5.12 %");

        let countries =
            std::fs::read_to_string(dir.path().join("IE00B4L5Y983.countries.log")).unwrap();
        assert_eq!(countries, "USA: 27.80 %\n");
        assert!(dir.path().join("IE00B4L5Y983.holdings.log").exists());
        assert!(log.errors().is_empty());
    }

    #[test]
    fn write_failure_is_collected_not_raised() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let mut log = FileImportLog::new(&missing);
        log.write_log("X", Category::Countries, "USA: 1.00 %");
        assert_eq!(log.errors().len(), 1);
    }
}

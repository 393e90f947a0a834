// File I/O operations - the tree-persistence collaborator

pub mod cache;
pub mod error;
pub mod logs;
pub mod portfolio;

pub use error::StoreError;
pub use logs::FileImportLog;

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// File read/write error.
    Io(String),
    /// Portfolio XML is not well-formed.
    Xml(String),
    /// Cache record JSON error.
    Json(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Xml(msg) => write!(f, "XML error: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

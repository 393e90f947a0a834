use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty category sets, overlapping names, etc.).
    ConfigValidation(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

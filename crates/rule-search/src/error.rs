use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RuleSearchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid label matcher: {0}")]
    InvalidMatcher(String),

    /// A term builder was handed a token produced by a different grammar rule.
    #[error("Grammar mismatch: {0}")]
    GrammarMismatch(String),

    #[error("Data source lookup failed: {0}")]
    DataSourceLookup(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, RuleSearchError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IvyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collaborator '{service}' failed: {message}")]
    Collaborator { service: String, message: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, IvyError>;

/// A per-field coercion failure. Recovered, never fatal: the owning record
/// is marked invalid and the batch continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldParseError {
    pub field: &'static str,
    pub value: String,
}

impl std::fmt::Display for FieldParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unparsable {}: {:?}", self.field, self.value)
    }
}

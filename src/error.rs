use crate::models::ItemId;

#[derive(thiserror::Error, Debug)]
pub enum RecError {
    #[error("Lookup error: item {0} is not in the catalog")]
    UnknownItem(ItemId),

    #[error("Lookup error: category '{0}' is not in the taxonomy")]
    UnknownCategory(String),

    #[error("Parse error in {source_name} line {line}: {reason}")]
    Parse {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Rating store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RecError {
    pub fn parse(source_name: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        RecError::Parse {
            source_name: source_name.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, RecError::UnknownItem(_) | RecError::UnknownCategory(_))
    }
}

impl From<redis::RedisError> for RecError {
    fn from(e: redis::RedisError) -> Self {
        RecError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for RecError {
    fn from(e: serde_json::Error) -> Self {
        RecError::Store(format!("serialization: {}", e))
    }
}

impl From<csv::Error> for RecError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            RecError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        } else {
            let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
            RecError::parse("csv", line, e.to_string())
        }
    }
}

impl From<reqwest::Error> for RecError {
    fn from(e: reqwest::Error) -> Self {
        RecError::Classifier(e.to_string())
    }
}

pub type RecResult<T> = Result<T, RecError>;

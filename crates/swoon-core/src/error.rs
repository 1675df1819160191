use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwoonError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A dress was referenced from a session that belongs to another shop.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Transient contention at the storage layer. Safe to retry.
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SwoonError {
    /// Returns `true` when the error is likely transient and worth retrying
    /// (busy or locked database, contention on the swipe insert).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::StorageConflict(_) => true,
            Self::Storage(msg) => is_transient_message(msg),
            _ => false,
        }
    }

    /// Short machine-readable name for the error kind, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidReference(_) => "invalid_reference",
            Self::StorageConflict(_) => "storage_conflict",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

fn is_transient_message(msg: &str) -> bool {
    let msg_lower = msg.to_lowercase();
    let patterns = [
        "database is locked",
        "database table is locked",
        "database is busy",
        "timed out",
        "temporarily unavailable",
    ];
    patterns.iter().any(|p| msg_lower.contains(p))
}

impl From<rusqlite::Error> for SwoonError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::StorageConflict(err.to_string())
            }
            _ => Self::Storage(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwoonError>;

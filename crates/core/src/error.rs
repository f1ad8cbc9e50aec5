//! Error types for the Labeler domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. None of them is fatal:
//! session errors are recoverable by the caller, catalog and persistence
//! errors degrade functionality.

use thiserror::Error;

/// The top-level error type for all Labeler operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Catalog errors ---
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    // --- Persistence errors ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Precondition violations on session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    #[error("No active session; log in first")]
    NoActiveSession,

    #[error("No domain is staged for classification")]
    NoStagedDomain,

    #[error("Invalid category name: {0:?}")]
    InvalidCategory(String),
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Catalog unavailable from {location}: {reason}")]
    Unavailable { location: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("Persistence store unavailable: {0}")]
    Unavailable(String),

    #[error("Persistence store rejected the request (status: {status_code})")]
    Rejected { status_code: u16 },

    #[error("Persisted document is corrupt: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_displays_correctly() {
        let err = Error::Session(SessionError::InvalidIdentity("123".into()));
        assert!(err.to_string().contains("Invalid identity"));
        assert!(err.to_string().contains("123"));
    }

    #[test]
    fn persistence_error_displays_correctly() {
        let err = Error::Persistence(PersistenceError::Rejected { status_code: 503 });
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn catalog_error_names_source() {
        let err = CatalogError::Unavailable {
            location: "assets/domains.txt".into(),
            reason: "No such file".into(),
        };
        assert!(err.to_string().contains("assets/domains.txt"));
    }
}

//! Store error types
//!
//! Two kinds of failure exist: reading the entry list (`Fetch`) and
//! mutating it (`Persistence`). Both are surfaced to the user as a single
//! message and never retried automatically.

use thiserror::Error;

/// Errors that can occur talking to the entry store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Initial or refresh list retrieval failed (transport, status or parse)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Save or delete was rejected or never reached the backend
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn is_fetch(&self) -> bool {
        matches!(self, StoreError::Fetch(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, StoreError::Persistence(_))
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Fetch("connection refused".to_string());
        assert_eq!(err.to_string(), "Fetch error: connection refused");

        let err = StoreError::Persistence("duplicate id".to_string());
        assert_eq!(err.to_string(), "Persistence error: duplicate id");
    }

    #[test]
    fn test_error_kind() {
        assert!(StoreError::Fetch(String::new()).is_fetch());
        assert!(!StoreError::Fetch(String::new()).is_persistence());
        assert!(StoreError::Persistence(String::new()).is_persistence());
    }
}

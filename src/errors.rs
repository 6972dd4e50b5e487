//! Error types for hydronet
//!
//! This module defines the error types used throughout the library.
//! Referential problems (unknown or duplicate ids) are returned as `Err`
//! values from the offending operation; structural problems (cycles,
//! missing sources) are never raised here — they surface as validator
//! findings instead.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Main error type for hydronet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// An entity with this id already exists
    #[error("Duplicate id: {id}")]
    DuplicateId { id: String },

    /// A component id was referenced that does not exist
    #[error("Unknown component: {id}")]
    UnknownComponent { id: String },

    /// A block id was referenced that does not exist
    #[error("Unknown block: {id}")]
    UnknownBlock { id: String },

    /// An operation tried to relate an entity to itself
    /// (self-loop edge, self-parenting block)
    #[error("Self reference: {id}")]
    SelfReference { id: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl NetworkError {
    /// Create a duplicate id error
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Create an unknown component error
    pub fn unknown_component(id: impl Into<String>) -> Self {
        Self::UnknownComponent { id: id.into() }
    }

    /// Create an unknown block error
    pub fn unknown_block(id: impl Into<String>) -> Self {
        Self::UnknownBlock { id: id.into() }
    }

    /// Create a self reference error
    pub fn self_reference(id: impl Into<String>) -> Self {
        Self::SelfReference { id: id.into() }
    }

    /// Check if this error is referential (a bad id passed by the caller)
    pub fn is_referential(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId { .. }
                | Self::UnknownComponent { .. }
                | Self::UnknownBlock { .. }
                | Self::SelfReference { .. }
        )
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NetworkError::duplicate_id("MC1");
        assert!(err.to_string().contains("Duplicate id"));
        assert!(err.to_string().contains("MC1"));

        let err = NetworkError::unknown_block("B7");
        assert!(err.to_string().contains("Unknown block"));
        assert!(err.to_string().contains("B7"));
    }

    #[test]
    fn test_is_referential() {
        assert!(NetworkError::unknown_component("F1").is_referential());
        assert!(NetworkError::self_reference("B1").is_referential());

        let err = NetworkError::Serialization {
            message: "bad json".to_string(),
        };
        assert!(!err.is_referential());
    }
}

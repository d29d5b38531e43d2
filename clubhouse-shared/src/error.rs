//! Domain errors
//!
//! Raised by pure entity operations (state transitions, cross-field checks).
//! The API layer maps `Invalid` to a per-field validation response and
//! `InvalidState` to a plain 400.

/// Error raised when an entity operation is not allowed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A field value is inconsistent with the rest of the record
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    /// The entity is not in a state that allows the operation
    #[error("{0}")]
    InvalidState(String),
}

impl DomainError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        DomainError::InvalidState(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = DomainError::invalid("category", "Invalid category for income transaction");
        assert_eq!(
            err.to_string(),
            "category: Invalid category for income transaction"
        );

        let err = DomainError::state("Article is already published");
        assert_eq!(err.to_string(), "Article is already published");
    }
}

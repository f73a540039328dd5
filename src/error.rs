//! Error types for the reasoning core

use thiserror::Error;

/// Failures raised by adaptation and retrieval
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An ingredient referenced by the query or by a case has no category.
    /// Callers are expected to filter query names before invoking the core.
    #[error("No category for ingredient: {0}")]
    MissingCategory(String),

    /// Every member of the category is undesired, so the ingredient cannot be
    /// replaced by a random sibling
    #[error("Cannot replace {ingredient}: no ingredient of category '{category}' is acceptable")]
    UnsatisfiableCategory {
        ingredient: String,
        category: String,
    },

    /// The query asks for an ingredient it also rejects
    #[error("Ingredient {0} is both desired and undesired")]
    ConflictingQuery(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, EngineError>;

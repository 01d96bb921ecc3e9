//! Cross-cutting error types for Agora.
//!
//! This module defines errors that can originate from any crate in the system.
//! Domain-specific errors (e.g., `DemocracyError`, `DatabaseError`) are defined in
//! their respective crates. Everything converges into `anyhow` in `agora-cli`.

use thiserror::Error;

/// Errors that can be raised by any Agora crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Password hashing or hash parsing failed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

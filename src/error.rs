//! Engine error taxonomy

use crate::gateway::GatewayError;
use crate::validation::ValidationError;
use thiserror::Error;

/// Errors surfaced by every public engine operation
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any side effect
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A remote call failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Unknown order or strategy identifier
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    /// The record exists but cannot take this operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: u64) -> Self {
        EngineError::NotFound { kind, id }
    }

    /// True when the operation was rejected before anything was attempted
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

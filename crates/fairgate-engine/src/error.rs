//! Error types for the fairgate engine.

use thiserror::Error;

use fairgate_state::StateError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures that abort an engine run.
///
/// Unreadable persisted state is not among them: the driver logs it and
/// starts over from empty state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to persist engine output: {0}")]
    Store(#[from] StateError),
}

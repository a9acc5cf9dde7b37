//! Domain error types
//!
//! Errors raised while turning configuration values into domain types.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A weekday name could not be parsed
    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    /// A time of day could not be parsed (expected `HH:MM` or `HH:MM:SS`)
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    /// The schedule definition is incomplete or contradictory
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },
}

//! Containment state machine value
//!
//! ```text
//! Running ──AuthExpired──→ Halted   (terminal)
//! ```
//!
//! There is no transition out of `Halted`. Leaving it requires a process
//! restart after the credential was refreshed out of band.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Process-wide containment state owned by the containment controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentState {
    /// Ticks capture and upload normally
    #[default]
    Running,
    /// The credential expired; no further capture or upload may happen
    Halted,
}

impl ContainmentState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }

    /// Returns the halted state, rejecting a second transition
    pub fn halt(self) -> Result<Self, DomainError> {
        match self {
            Self::Running => Ok(Self::Halted),
            Self::Halted => Err(DomainError::InvalidState {
                from: self.to_string(),
                to: Self::Halted.to_string(),
            }),
        }
    }
}

impl fmt::Display for ContainmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Halted => write!(f, "Halted"),
        }
    }
}

//! Typed result of a single upload attempt
//!
//! The photo-library adapter classifies every upstream failure into one
//! of these variants. Business logic matches on the variant and never
//! inspects error messages.

use std::fmt;

/// Outcome of submitting one image to the photo library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The image is stored in the album under `remote_id`
    Success {
        /// Media item identifier assigned by the photo library
        remote_id: String,
    },
    /// The stored credential can no longer be used; a human must re-authorize
    AuthExpired {
        /// Upstream error code or status that triggered the classification
        reason: String,
    },
    /// Any failure that may succeed on a later attempt
    TransientFailure {
        /// Short description for the log
        reason: String,
    },
}

impl UploadOutcome {
    pub fn success(remote_id: impl Into<String>) -> Self {
        Self::Success {
            remote_id: remote_id.into(),
        }
    }

    pub fn auth_expired(reason: impl Into<String>) -> Self {
        Self::AuthExpired {
            reason: reason.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientFailure {
            reason: reason.into(),
        }
    }

    /// Returns true for the one outcome that halts the process
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { remote_id } => write!(f, "success ({})", remote_id),
            Self::AuthExpired { reason } => write!(f, "auth expired ({})", reason),
            Self::TransientFailure { reason } => write!(f, "transient failure ({})", reason),
        }
    }
}

//! Use cases (interactors) for albumcam
//!
//! - [`ContainmentController`] - Runs one capture/upload tick and owns the
//!   halt-on-expired-credential state machine
//! - [`RetentionQueue`] - Bounded store of images whose upload failed transiently

pub mod containment;
pub mod retention;

pub use containment::{AlertMessage, ContainmentController, TickOutcome, TickReport};
pub use retention::RetentionQueue;

//! Domain entities and business logic
//!
//! This module contains the core domain types for albumcam:
//! - Capture results produced by the camera adapter
//! - Typed upload outcomes produced by the photo-library adapter
//! - The containment state machine value
//! - Capture schedules
//! - Domain-specific error types

pub mod capture;
pub mod containment;
pub mod errors;
pub mod schedule;
pub mod upload;

// Re-export commonly used types
pub use capture::CaptureResult;
pub use containment::ContainmentState;
pub use errors::DomainError;
pub use schedule::Schedule;
pub use upload::UploadOutcome;

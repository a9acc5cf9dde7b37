//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICaptureProvider`] - Takes a photo and writes it to local disk
//! - [`IUploadClient`] - Submits an image to the photo library, returning a typed outcome
//! - [`INotifier`] - Sends the one-shot operator alert

pub mod capture_provider;
pub mod notification;
pub mod upload_client;

pub use capture_provider::{CaptureError, ICaptureProvider};
pub use notification::{INotifier, NotifyError};
pub use upload_client::IUploadClient;

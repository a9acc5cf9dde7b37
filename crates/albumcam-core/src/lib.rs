//! albumcam Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `CaptureResult`, `UploadOutcome`, `ContainmentState`, `Schedule`
//! - **Use cases** - `ContainmentController` and its `RetentionQueue`
//! - **Port definitions** - Traits for adapters: `ICaptureProvider`, `IUploadClient`, `INotifier`
//!
//! # Architecture
//!
//! The domain module holds plain data and the schedule arithmetic.
//! Ports define trait interfaces that adapter crates (camera, photos,
//! notify) implement. The containment use case drives one scheduled tick
//! through those ports and owns the process-wide halted state.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;

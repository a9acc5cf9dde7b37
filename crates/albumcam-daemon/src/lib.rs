//! albumcam Daemon - scheduled capture and upload service
//!
//! The `albumcamd` binary wires the adapters into a
//! [`ContainmentController`](albumcam_core::usecases::ContainmentController)
//! and drives it from the configured schedule until it is told to stop or
//! the controller halts on an expired credential.

pub mod logging;
pub mod runner;
pub mod service;

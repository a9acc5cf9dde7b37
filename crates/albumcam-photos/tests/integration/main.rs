//! Integration tests for albumcam-photos
//!
//! Uses wiremock to simulate the Photos Library API and the Google token
//! endpoint, and verifies album resolution, uploads, token refresh and
//! the outcome classification seen by the daemon.

mod common;

mod test_albums;
mod test_callback;
mod test_provider;
mod test_upload;

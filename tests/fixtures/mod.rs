//! Test Fixtures Module
//!
//! Shared helpers for the vocero integration tests:
//! - Audio fixtures (programmatically generated)
//! - Wire message fixtures for the live channel protocol

// Each test binary compiles this module separately, so not every helper
// is used by every binary.
#![allow(dead_code)]

pub mod audio_fixtures;

pub use audio_fixtures::*;

//! Test utilities shared by the unit tests
//!
//! Scripted HTTP responses and ready-made players, so tests never touch the
//! network.

pub mod fixtures;

pub use fixtures::*;

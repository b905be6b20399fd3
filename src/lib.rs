//! Rommate - disc-image organization tool
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod playlist;
pub mod processor;
pub mod scanner;
pub mod state;

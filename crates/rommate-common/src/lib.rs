//! Shared types for the rommate workspace: disc formats and the unified
//! error type.

pub mod error;
pub mod formats;

pub use error::{Error, Result};
pub use formats::DiscFormat;

//! Conversion pipeline: tool resolution and run execution.

pub mod executor;
pub mod tool;

pub use executor::ConversionRun;
pub use tool::{ChdTool, ToolError};

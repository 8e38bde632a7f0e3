//! pfish runner - runs operation type tests through pfish
//!
//! This library discovers operation type definitions on disk and executes
//! the ones named as tests with the `pfish` command-line tool.

pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{DefinitionRecord, Invocation, Runner};

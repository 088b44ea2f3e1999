//! External tool abstractions
//!
//! Trait-based abstraction over external CLI tools (the Go toolchain, git),
//! enabling testable code through dependency injection and mock
//! implementations.

pub mod command;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};

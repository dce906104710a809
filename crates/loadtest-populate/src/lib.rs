//! Shared command-line arguments for stress-writer commands.
//!
//! Both the `mixed` and `write` commands flatten `StressArgs`, so every
//! override is spelled the same way regardless of the command.

pub mod args;

pub use args::{parse_ratio, StressArgs};

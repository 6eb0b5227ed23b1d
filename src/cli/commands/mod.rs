//! Command implementations.
//!
//! Each command is defined in its own module file.

pub mod fs_commands;
pub mod help;

pub use fs_commands::{CD, LS};
pub use help::HELP;

//! Command interpreter.
//!
//! # Architecture
//!
//! - `command.rs` - Defines the `Command` trait, tokenizer and execution context
//! - `registry.rs` - Bounded command binding table and lookup
//! - `history.rs` - Byte-bounded command history
//! - `tty.rs` - Input ring, echo, line editing and dispatch
//! - `commands/` - Individual command implementations
//!
//! # Adding a New Command
//!
//! 1. Create a new file in `commands/` (e.g., `commands/mycommand.rs`)
//! 2. Define a struct and implement the `Command` trait
//! 3. Export a static instance: `pub static MYCOMMAND: MyCommand = MyCommand;`
//! 4. Add to `commands/mod.rs`: `pub mod mycommand;` and `pub use mycommand::MYCOMMAND;`
//! 5. Bind it with `Cli::add_binding(&commands::MYCOMMAND)`

mod command;
pub mod commands;
mod history;
mod registry;
mod tty;

pub use command::{Args, Command, CommandContext, tokenize};
pub use history::CommandHistory;
pub use registry::Registry;
pub use tty::Cli;

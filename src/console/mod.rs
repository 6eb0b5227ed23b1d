//! Console module - terminal output and logging facilities.
//!
//! Shell output goes to whatever `core::fmt::Write` sink the application was
//! given; log records go through the logger to a print function registered
//! by the binary.

pub mod logger;

#[macro_use]
pub mod print;

pub use logger::init as init_logger;

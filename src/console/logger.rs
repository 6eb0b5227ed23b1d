//! Logger implementation for the log crate.

use alloc::boxed::Box;
use core::fmt::{self, Display};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::ExplorerResult;

/// Sink for formatted log lines (a UART, stderr, ...).
pub type PrintFn = fn(fmt::Arguments);

pub struct SimpleLogger {
    print: PrintFn,
    level: LevelFilter,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCode {
    Red = 31,
    Green = 32,
    Yellow = 33,
    Cyan = 36,
    BrightBlack = 90,
    BrightRed = 91,
    BrightGreen = 92,
    BrightYellow = 93,
    BrightCyan = 96,
}

impl Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\u{1B}[{}m", *self as u8)
    }
}

/// Colors for the level tag and the message.
fn level_colors(level: Level) -> (ColorCode, ColorCode) {
    match level {
        Level::Error => (ColorCode::BrightRed, ColorCode::Red),
        Level::Warn => (ColorCode::BrightYellow, ColorCode::Yellow),
        Level::Info => (ColorCode::BrightGreen, ColorCode::Green),
        Level::Debug => (ColorCode::BrightCyan, ColorCode::Cyan),
        Level::Trace => (ColorCode::BrightBlack, ColorCode::BrightBlack),
    }
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        let file = record.file().unwrap_or("none");
        let line = record.line().unwrap_or(0);
        let args = record.args();
        let color_reset = "\u{1B}[0m";
        let (level_color, args_color) = level_colors(level);

        (self.print)(format_args!(
            "{level_color}[{level:<5}{color_reset} {file}:{line}] {args_color}{args}{color_reset}\n"
        ));
    }

    fn flush(&self) {}
}

/// Install the logger, printing through `print` at the build-time `LOG` level.
pub fn init(print: PrintFn) -> ExplorerResult<()> {
    let level = crate::config::log_level();
    let logger = Box::leak(Box::new(SimpleLogger { print, level }));
    log::set_logger(logger).map_err(|_| anyhow::anyhow!("logger already installed"))?;
    log::set_max_level(level);
    Ok(())
}

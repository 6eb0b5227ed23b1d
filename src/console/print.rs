//! Terminal print macros.
//!
//! Lines sent to the terminal end in `\r\n`. Write errors are ignored:
//! printing should not fail a command.

/// Print to a terminal sink.
#[macro_export]
macro_rules! out {
    ($out:expr, $($arg:tt)*) => ({
        let _ = core::fmt::Write::write_fmt($out, format_args!($($arg)*));
    });
}

/// Print to a terminal sink with a `\r\n` line ending.
#[macro_export]
macro_rules! outln {
    ($out:expr) => ($crate::out!($out, "\r\n"));
    ($out:expr, $($arg:tt)*) => ($crate::out!($out, "{}\r\n", format_args!($($arg)*)));
}

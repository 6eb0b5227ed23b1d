//! Configuration constants.

use log::LevelFilter;

/// Number of device slots. Slot index = device address - 1.
pub const DEVICE_MAX: usize = 4;

/// Only the first logical unit of each device is mounted.
pub const MSC_LUN: u8 = 0;

pub const CLI_BUFFER_SIZE: usize = 256;
pub const CLI_RX_BUFFER_SIZE: usize = 16;
pub const CLI_CMD_BUFFER_SIZE: usize = 32;
pub const CLI_HISTORY_SIZE: usize = 32;
pub const CLI_BINDING_COUNT: usize = 3;

pub const PROMPT: &str = "> ";

/// Sizes of one command-interpreter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliConfig {
    /// Total budget shared by the rx, command and history buffers.
    pub buffer_size: usize,
    pub rx_buffer_size: usize,
    pub cmd_buffer_size: usize,
    /// History budget in bytes.
    pub history_size: usize,
    pub max_bindings: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            buffer_size: CLI_BUFFER_SIZE,
            rx_buffer_size: CLI_RX_BUFFER_SIZE,
            cmd_buffer_size: CLI_CMD_BUFFER_SIZE,
            history_size: CLI_HISTORY_SIZE,
            max_bindings: CLI_BINDING_COUNT,
        }
    }
}

impl CliConfig {
    /// Check that the buffers fit in the total budget.
    pub fn validate(&self) -> crate::ExplorerResult<()> {
        anyhow::ensure!(self.rx_buffer_size > 0, "rx buffer size must be positive");
        anyhow::ensure!(self.cmd_buffer_size > 0, "command buffer size must be positive");
        anyhow::ensure!(self.max_bindings > 0, "at least one binding is required");
        let used = self.rx_buffer_size + self.cmd_buffer_size + self.history_size;
        anyhow::ensure!(
            used <= self.buffer_size,
            "cli buffers need {} bytes but only {} are configured",
            used,
            self.buffer_size
        );
        Ok(())
    }
}

/// Log level selected at build time through the `LOG` environment variable.
pub fn log_level() -> LevelFilter {
    parse_log_level(option_env!("LOG"))
}

fn parse_log_level(level: Option<&str>) -> LevelFilter {
    match level {
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

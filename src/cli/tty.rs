//! Line discipline of the command interpreter.
//!
//! Characters arrive through [`Cli::receive_char`] into a small bounded ring
//! (typically from an interrupt handler or the main loop) and are consumed by
//! [`Cli::process`], which echoes input, edits the line and dispatches
//! completed lines to the bound commands.
//!
//! Supports command history navigation with Up/Down arrow keys and TAB
//! completion of command names.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use log::{debug, trace, warn};

use crate::ExplorerResult;
use crate::cli::{Command, CommandContext, CommandHistory, Registry};
use crate::config::{CliConfig, PROMPT};
use crate::fs::Volumes;

/// ANSI escape sequence state machine.
#[derive(Clone, Copy, PartialEq)]
enum EscapeState {
    Normal,
    Escape,  // Got ESC (0x1B)
    Bracket, // Got ESC [
}

/// One command-interpreter instance.
pub struct Cli {
    config: CliConfig,
    rx: VecDeque<u8>,
    line: String,
    history: CommandHistory,
    registry: Registry,
    esc_state: EscapeState,
    last_was_cr: bool,
}

impl Cli {
    pub fn new(config: CliConfig) -> ExplorerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rx: VecDeque::with_capacity(config.rx_buffer_size),
            line: String::with_capacity(config.cmd_buffer_size),
            history: CommandHistory::new(config.history_size),
            registry: Registry::with_capacity(config.max_bindings),
            esc_state: EscapeState::Normal,
            last_was_cr: false,
        })
    }

    pub fn add_binding(&mut self, cmd: &'static dyn Command) -> ExplorerResult<()> {
        self.registry.add(cmd)?;
        debug!("cli: bound '{}'", cmd.name());
        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// The line being edited.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Queue one input character. Returns `false` (and drops it) when the
    /// input ring is full.
    pub fn receive_char(&mut self, c: u8) -> bool {
        if self.rx_full() {
            warn!("cli: input buffer full, dropping {:#04x}", c);
            return false;
        }
        self.rx.push_back(c);
        true
    }

    pub fn rx_full(&self) -> bool {
        self.rx.len() >= self.config.rx_buffer_size
    }

    pub fn print_prompt(&self, out: &mut dyn Write) {
        crate::out!(out, "{}", PROMPT);
    }

    /// Consume all queued input.
    pub fn process(&mut self, volumes: &mut Volumes, out: &mut dyn Write) {
        while let Some(c) = self.rx.pop_front() {
            self.handle_char(c, volumes, out);
        }
    }

    fn handle_char(&mut self, c: u8, volumes: &mut Volumes, out: &mut dyn Write) {
        let after_cr = core::mem::replace(&mut self.last_was_cr, c == b'\r');

        match self.esc_state {
            EscapeState::Normal => match c {
                0x1B => self.esc_state = EscapeState::Escape,
                // CR LF is one line ending
                b'\n' if after_cr => {}
                b'\r' | b'\n' => self.submit(volumes, out),
                8 | 127 => {
                    if self.line.pop().is_some() {
                        // Move cursor back, overwrite with space, move back again
                        crate::out!(out, "\x08 \x08");
                    }
                }
                b'\t' => self.complete(out),
                c if c.is_ascii_graphic() || c == b' ' => {
                    self.history.reset_navigation();
                    if self.line.len() < self.config.cmd_buffer_size {
                        self.line.push(c as char);
                        crate::out!(out, "{}", c as char);
                    } else {
                        trace!("cli: line full, dropping {:#04x}", c);
                    }
                }
                _ => {}
            },
            EscapeState::Escape => {
                self.esc_state = if c == b'[' {
                    EscapeState::Bracket
                } else {
                    EscapeState::Normal
                };
            }
            EscapeState::Bracket => {
                self.esc_state = EscapeState::Normal;
                match c {
                    b'A' => self.history_prev(out),
                    b'B' => self.history_next(out),
                    _ => {}
                }
            }
        }
    }

    fn submit(&mut self, volumes: &mut Volumes, out: &mut dyn Write) {
        crate::outln!(out);

        let line = core::mem::take(&mut self.line);
        let line = line.trim();
        if !line.is_empty() {
            self.history.push(line);
        }
        self.history.reset_navigation();

        self.execute(line, volumes, out);
        self.print_prompt(out);
    }

    /// Dispatch one command line.
    pub fn execute(&self, line: &str, volumes: &mut Volumes, out: &mut dyn Write) {
        let Some(mut ctx) = CommandContext::parse(line, out, volumes, &self.registry) else {
            return;
        };

        match self.registry.find(&ctx.command) {
            Some(cmd) => {
                debug!("cli: running '{}'", ctx.raw);
                if let Err(e) = cmd.execute(&mut ctx) {
                    debug!("cli: '{}' failed: {}", ctx.command, e);
                }
            }
            None => crate::outln!(ctx.out, "{}: command not found", ctx.command),
        }
    }

    /// TAB: complete a unique command-name prefix, or list the candidates.
    fn complete(&mut self, out: &mut dyn Write) {
        if self.line.contains(' ') {
            return;
        }
        let candidates: Vec<&'static str> = self.registry.complete(&self.line).collect();
        match candidates.as_slice() {
            [] => {}
            [name] => {
                let rest = &name[self.line.len()..];
                if self.line.len() + rest.len() + 1 <= self.config.cmd_buffer_size {
                    crate::out!(out, "{} ", rest);
                    self.line.push_str(rest);
                    self.line.push(' ');
                }
            }
            names => {
                crate::outln!(out);
                for name in names {
                    crate::out!(out, "{}  ", name);
                }
                crate::outln!(out);
                self.print_prompt(out);
                crate::out!(out, "{}", self.line);
            }
        }
    }

    /// Up arrow - previous history entry.
    fn history_prev(&mut self, out: &mut dyn Write) {
        if let Some(prev) = self.history.prev(&self.line) {
            let prev = String::from(prev);
            self.replace_line(prev, out);
        }
    }

    /// Down arrow - next history entry.
    fn history_next(&mut self, out: &mut dyn Write) {
        if let Some(next) = self.history.next() {
            let next = String::from(next);
            self.replace_line(next, out);
        }
    }

    /// Clear current line on terminal and redraw with new content.
    fn replace_line(&mut self, new_line: String, out: &mut dyn Write) {
        let old_len = self.line.len();
        for _ in 0..old_len {
            crate::out!(out, "\x08");
        }
        for _ in 0..old_len {
            crate::out!(out, " ");
        }
        for _ in 0..old_len {
            crate::out!(out, "\x08");
        }
        crate::out!(out, "{}", new_line);
        self.line = new_line;
    }
}

//! Command history management.

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};

/// Command history buffer, bounded by the bytes its entries take up.
pub struct CommandHistory {
    /// Oldest first.
    entries: VecDeque<String>,
    /// Bytes held by `entries`.
    used: usize,
    /// Byte budget.
    capacity: usize,
    /// Steps back from the newest entry; 0 while editing a fresh line.
    index: usize,
    /// The line that was being typed when navigation started.
    current_line: String,
    navigating: bool,
}

impl CommandHistory {
    /// Create a new empty history holding at most `capacity` bytes.
    pub const fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            used: 0,
            capacity,
            index: 0,
            current_line: String::new(),
            navigating: false,
        }
    }

    /// Add a command to history.
    pub fn push(&mut self, cmd: &str) {
        if cmd.is_empty() || self.entries.back().is_some_and(|last| last == cmd) {
            return;
        }
        if cmd.len() > self.capacity {
            return;
        }

        while self.used + cmd.len() > self.capacity {
            match self.entries.pop_front() {
                Some(old) => self.used -= old.len(),
                None => break,
            }
        }
        self.used += cmd.len();
        self.entries.push_back(cmd.to_string());

        self.reset_navigation();
    }

    fn start_navigation(&mut self, current: &str) {
        if !self.navigating {
            self.current_line = current.to_string();
            self.navigating = true;
            self.index = 0;
        }
    }

    /// Reset navigation state.
    pub fn reset_navigation(&mut self) {
        self.navigating = false;
        self.index = 0;
        self.current_line.clear();
    }

    /// Up arrow: the next older entry, sticking at the oldest.
    pub fn prev(&mut self, current: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }

        self.start_navigation(current);

        if self.index < self.entries.len() {
            self.index += 1;
        }
        let entry_idx = self.entries.len() - self.index;
        Some(&self.entries[entry_idx])
    }

    /// Down arrow: the next newer entry, then the saved line.
    pub fn next(&mut self) -> Option<&str> {
        if !self.navigating {
            return None;
        }

        if self.index > 1 {
            self.index -= 1;
            let entry_idx = self.entries.len() - self.index;
            Some(&self.entries[entry_idx])
        } else {
            // Back at the line being typed
            self.index = 0;
            Some(&self.current_line)
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn entries(history: &CommandHistory) -> Vec<&str> {
        history.entries().collect()
    }

    #[test]
    fn test_push_skips_empty_and_repeats() {
        let mut history = CommandHistory::new(32);
        history.push("ls");
        history.push("ls");
        history.push("");
        history.push("cd docs");
        history.push("ls");
        assert_eq!(entries(&history), ["ls", "cd docs", "ls"]);
    }

    #[test]
    fn test_byte_budget_evicts_oldest() {
        let mut history = CommandHistory::new(10);
        history.push("cd abc");
        history.push("ls");
        history.push("cd xy");
        assert_eq!(entries(&history), ["ls", "cd xy"]);

        history.push("this line is too long");
        assert_eq!(entries(&history), ["ls", "cd xy"]);
    }

    #[test]
    fn test_navigation_restores_current_line() {
        let mut history = CommandHistory::new(32);
        history.push("ls");
        history.push("cd docs");

        assert_eq!(history.next(), None);
        assert_eq!(history.prev("he"), Some("cd docs"));
        assert_eq!(history.prev("he"), Some("ls"));
        assert_eq!(history.prev("he"), Some("ls"));
        assert_eq!(history.next(), Some("cd docs"));
        assert_eq!(history.next(), Some("he"));
        assert_eq!(history.next(), Some("he"));
    }

    #[test]
    fn test_empty_history_has_nothing_to_recall() {
        let mut history = CommandHistory::new(32);
        assert!(history.is_empty());
        assert_eq!(history.prev("ls"), None);
        assert_eq!(history.next(), None);
    }
}

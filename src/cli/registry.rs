//! Command registry - bounded command binding table and lookup.

use alloc::vec::Vec;

use crate::ExplorerResult;
use crate::cli::Command;

/// The commands bound into one interpreter.
///
/// To add a new command:
/// 1. Create a new file in `commands/` directory
/// 2. Implement the `Command` trait
/// 3. Export a static instance
/// 4. Bind it with [`Registry::add`]
pub struct Registry {
    commands: Vec<&'static dyn Command>,
    capacity: usize,
}

impl Registry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Bind a command. Fails when the table is full or a name is taken.
    pub fn add(&mut self, cmd: &'static dyn Command) -> ExplorerResult<()> {
        anyhow::ensure!(
            self.commands.len() < self.capacity,
            "no room to bind '{}' ({} bindings max)",
            cmd.name(),
            self.capacity
        );
        for name in core::iter::once(cmd.name()).chain(cmd.aliases().iter().copied()) {
            anyhow::ensure!(self.find(name).is_none(), "'{}' is already bound", name);
        }
        self.commands.push(cmd);
        Ok(())
    }

    /// Find a command by name or alias.
    pub fn find(&self, name: &str) -> Option<&'static dyn Command> {
        self.commands
            .iter()
            .copied()
            .find(|cmd| cmd.name() == name || cmd.aliases().iter().any(|alias| *alias == name))
    }

    /// Get all bound commands, in binding order.
    pub fn all(&self) -> &[&'static dyn Command] {
        &self.commands
    }

    /// Command names starting with `prefix`, in binding order.
    pub fn complete<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.commands
            .iter()
            .map(|cmd| cmd.name())
            .filter(move |name| name.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CommandContext;
    use crate::cli::commands::{CD, HELP, LS};

    struct Dummy(&'static str);

    impl Command for Dummy {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "dummy"
        }

        fn execute(&self, _ctx: &mut CommandContext) -> ExplorerResult<()> {
            Ok(())
        }
    }

    static CAT: Dummy = Dummy("cat");
    static LS_AGAIN: Dummy = Dummy("ls");

    #[test]
    fn test_find_by_name_and_alias() {
        let mut registry = Registry::with_capacity(3);
        registry.add(&HELP).unwrap();
        registry.add(&LS).unwrap();
        assert_eq!(registry.find("ls").map(|c| c.name()), Some("ls"));
        assert_eq!(registry.find("?").map(|c| c.name()), Some("help"));
        assert!(registry.find("cd").is_none());
    }

    #[test]
    fn test_add_fails_when_full() {
        let mut registry = Registry::with_capacity(3);
        registry.add(&HELP).unwrap();
        registry.add(&CD).unwrap();
        registry.add(&LS).unwrap();
        assert!(registry.add(&CAT).is_err());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut registry = Registry::with_capacity(3);
        registry.add(&LS).unwrap();
        assert!(registry.add(&LS_AGAIN).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_complete_prefix() {
        let mut registry = Registry::with_capacity(3);
        registry.add(&CAT).unwrap();
        registry.add(&CD).unwrap();
        registry.add(&LS).unwrap();
        assert_eq!(registry.complete("c").collect::<Vec<_>>(), ["cat", "cd"]);
        assert_eq!(registry.complete("l").collect::<Vec<_>>(), ["ls"]);
        assert_eq!(registry.complete("x").count(), 0);
    }
}

//! Help command - displays available commands and their usage.

use alloc::string::String;
use alloc::vec::Vec;

use crate::ExplorerResult;
use crate::cli::{Command, CommandContext};

/// Help command instance.
pub static HELP: HelpCommand = HelpCommand;

/// Help command implementation.
pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["?"]
    }

    fn description(&self) -> &'static str {
        "Show available commands or help for a specific command"
    }

    fn usage(&self) -> &'static str {
        "Usage: help [command]...\r\n\
         \r\n\
         Without arguments: lists all available commands.\r\n\
         With command names: shows detailed help for each of them."
    }

    fn execute(&self, ctx: &mut CommandContext) -> ExplorerResult<()> {
        if ctx.args.is_empty() {
            return show_all_commands(ctx);
        }
        let names: Vec<String> = ctx.args.iter().map(String::from).collect();
        for name in &names {
            show_command_help(ctx, name)?;
        }
        Ok(())
    }
}

fn show_command_help(ctx: &mut CommandContext, name: &str) -> ExplorerResult<()> {
    let Some(cmd) = ctx.registry.find(name) else {
        crate::outln!(ctx.out, "Unknown command: {}", name);
        crate::outln!(ctx.out, "Type 'help' to see available commands.");
        anyhow::bail!("Command not found: {}", name)
    };

    crate::out!(ctx.out, "Command: {}", cmd.name());
    let aliases = cmd.aliases();
    if !aliases.is_empty() {
        crate::out!(ctx.out, " (aliases: {})", aliases.join(", "));
    }
    crate::outln!(ctx.out);
    crate::outln!(ctx.out, "{}", cmd.usage());
    Ok(())
}

fn show_all_commands(ctx: &mut CommandContext) -> ExplorerResult<()> {
    crate::outln!(ctx.out, "Available commands:\r\n");

    let registry = ctx.registry;
    let commands = registry.all();

    // Collect unique categories, general first, then alphabetically
    let mut categories: Vec<&'static str> = Vec::new();
    for cmd in commands {
        if !categories.contains(&cmd.category()) {
            categories.push(cmd.category());
        }
    }
    categories.sort_by_key(|cat| (*cat != "general", *cat));

    for category in categories {
        crate::outln!(ctx.out, "[{}]", category);
        for cmd in commands.iter().filter(|cmd| cmd.category() == category) {
            crate::outln!(ctx.out, "  {:12} - {}", cmd.name(), cmd.description());
        }
        crate::outln!(ctx.out);
    }

    crate::outln!(ctx.out, "Type 'help <command>' for detailed usage.");
    Ok(())
}

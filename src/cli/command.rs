//! Command trait, argument tokenizer and execution context.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::ExplorerResult;
use crate::cli::Registry;
use crate::fs::Volumes;

/// Split a line into tokens.
///
/// Tokens are separated by spaces. Double quotes group text containing
/// spaces and a backslash takes the next character literally.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    token.push(next);
                }
                in_token = true;
            }
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(core::mem::take(&mut token));
                    in_token = false;
                }
            }
            c => {
                token.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(token);
    }
    tokens
}

/// Parsed command arguments.
pub struct Args {
    args: Vec<String>,
}

impl Args {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// Get argument at index (0 is first argument after command name).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Arguments in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.args.iter().map(String::as_str)
    }
}

/// Command execution context.
pub struct CommandContext<'a> {
    /// The input line, trimmed.
    pub raw: &'a str,
    /// The command name that was invoked.
    pub command: String,
    /// Parsed arguments (excluding command name).
    pub args: Args,
    /// Terminal output.
    pub out: &'a mut dyn Write,
    pub volumes: &'a mut Volumes,
    pub registry: &'a Registry,
}

impl<'a> CommandContext<'a> {
    /// Create a new command context by parsing a line.
    pub fn parse(
        line: &'a str,
        out: &'a mut dyn Write,
        volumes: &'a mut Volumes,
        registry: &'a Registry,
    ) -> Option<Self> {
        let line = line.trim();
        let mut tokens = tokenize(line);
        if tokens.is_empty() {
            return None;
        }
        let command = tokens.remove(0);

        Some(Self {
            raw: line,
            command,
            args: Args::new(tokens),
            out,
            volumes,
            registry,
        })
    }
}

/// Trait for implementing commands.
///
/// Commands are bound into a [`Registry`] and looked up by name or alias.
pub trait Command: Sync {
    /// Primary command name.
    fn name(&self) -> &'static str;

    /// Alternative names for this command.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Short description (shown in help list).
    fn description(&self) -> &'static str;

    /// Detailed usage information (shown in `help <command>`).
    fn usage(&self) -> &'static str {
        self.description()
    }

    /// Command category for grouping in help.
    fn category(&self) -> &'static str {
        "general"
    }

    /// Execute the command with the given context.
    fn execute(&self, ctx: &mut CommandContext) -> ExplorerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_plain() {
        assert_eq!(tokenize("ls  docs "), ["ls", "docs"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_tokenize_quotes_and_escapes() {
        assert_eq!(tokenize(r#"cd "my dir""#), ["cd", "my dir"]);
        assert_eq!(tokenize(r"cd my\ dir"), ["cd", "my dir"]);
        assert_eq!(tokenize(r#"ls """#), ["ls", ""]);
        assert_eq!(tokenize(r#"a\"b"#), [r#"a"b"#]);
    }

    #[test]
    fn test_parse_context() {
        let mut out = String::new();
        let mut volumes = Volumes::new();
        let registry = Registry::with_capacity(1);
        let ctx = CommandContext::parse(
            "  cd   \"a b\" c ",
            &mut out,
            &mut volumes,
            &registry,
        )
        .unwrap();
        assert_eq!(ctx.command, "cd");
        assert_eq!(ctx.args.len(), 2);
        assert_eq!(ctx.args.get(0), Some("a b"));
        assert_eq!(ctx.args.get(1), Some("c"));
        assert_eq!(ctx.args.iter().collect::<Vec<_>>(), ["a b", "c"]);
        assert_eq!(ctx.raw, "cd   \"a b\" c");
    }

    #[test]
    fn test_parse_empty_line() {
        let mut out = String::new();
        let mut volumes = Volumes::new();
        let registry = Registry::with_capacity(1);
        assert!(CommandContext::parse("   ", &mut out, &mut volumes, &registry).is_none());
    }
}

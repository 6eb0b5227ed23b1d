//! Filesystem commands.

use log::debug;

use crate::ExplorerResult;
use crate::cli::{Command, CommandContext};

/// List directory contents.
pub static LS: LsCommand = LsCommand;

pub struct LsCommand;

impl Command for LsCommand {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn description(&self) -> &'static str {
        "List directory contents"
    }

    fn usage(&self) -> &'static str {
        "Usage: ls [DIR]...\r\n\tList information about the FILEs (the current directory by default)."
    }

    fn category(&self) -> &'static str {
        "filesystem"
    }

    fn execute(&self, ctx: &mut CommandContext) -> ExplorerResult<()> {
        // only one directory at a time
        if ctx.args.len() > 1 {
            crate::outln!(ctx.out, "invalid arguments");
            return Ok(());
        }

        let path = ctx.args.get(0).unwrap_or(".");
        let entries = match ctx.volumes.read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("ls {}: {}", path, e);
                crate::outln!(ctx.out, "cannot access '{}': No such file or directory", path);
                return Ok(());
            }
        };

        // hidden entries, `.` and `..` included
        for entry in entries.iter().filter(|e| !e.name.starts_with('.')) {
            if entry.is_dir {
                crate::outln!(ctx.out, "/{}", entry.name);
            } else {
                crate::outln!(ctx.out, "{:<40}{} KB", entry.name, entry.size / 1000);
            }
        }
        Ok(())
    }
}

/// Change directory.
pub static CD: CdCommand = CdCommand;

pub struct CdCommand;

impl Command for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn description(&self) -> &'static str {
        "Change current working directory"
    }

    fn usage(&self) -> &'static str {
        "Usage: cd [DIR]...\r\n\tChange the current directory to DIR."
    }

    fn category(&self) -> &'static str {
        "filesystem"
    }

    fn execute(&self, ctx: &mut CommandContext) -> ExplorerResult<()> {
        let path = match (ctx.args.get(0), ctx.args.len()) {
            (Some(path), 1) => path,
            _ => {
                crate::outln!(ctx.out, "invalid arguments");
                return Ok(());
            }
        };

        if let Err(e) = ctx.volumes.change_dir(path) {
            debug!("cd {}: {}", path, e);
            crate::outln!(ctx.out, "{}: No such file or directory", path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;

    use super::*;
    use crate::cli::Registry;
    use crate::disk::{MscDisk, SharedDisk};
    use crate::fs::Volumes;
    use crate::sync::Mutex;
    use crate::usb::{RamDevice, SimHost};

    struct Fixture {
        disk: Arc<Mutex<MscDisk<SimHost>>>,
        volumes: Volumes,
        registry: Registry,
    }

    impl Fixture {
        fn new() -> Self {
            let device = RamDevice::builder()
                .dir("docs")
                .dir(".hidden")
                .file("docs/notes.txt", b"some notes")
                .file("big.bin", &[0u8; 4321])
                .build()
                .unwrap();
            let mut host = SimHost::new();
            host.attach(1, device).unwrap();
            let disk = Arc::new(Mutex::new(MscDisk::new(host)));
            disk.lock().task();

            let shared: SharedDisk = disk.clone();
            let mut volumes = Volumes::new();
            volumes.mount(0, shared).unwrap();
            volumes.change_drive(0).unwrap();

            let mut registry = Registry::with_capacity(2);
            registry.add(&CD).unwrap();
            registry.add(&LS).unwrap();
            Self {
                disk,
                volumes,
                registry,
            }
        }

        fn run(&mut self, line: &str) -> String {
            let mut out = String::new();
            let mut ctx =
                CommandContext::parse(line, &mut out, &mut self.volumes, &self.registry).unwrap();
            let cmd = self.registry.find(&ctx.command).unwrap();
            cmd.execute(&mut ctx).unwrap();
            out
        }

        fn transfers(&self) -> usize {
            self.disk.lock().host().stats().transfers()
        }
    }

    #[test]
    fn test_ls_root() {
        let mut fx = Fixture::new();
        let out = fx.run("ls");
        assert!(out.contains("/docs\r\n"));
        assert!(out.contains(&alloc::format!("{:<40}4 KB\r\n", "big.bin")));
        assert!(!out.contains("hidden"));
    }

    #[test]
    fn test_ls_path_argument() {
        let mut fx = Fixture::new();
        let out = fx.run("ls docs");
        assert_eq!(out, alloc::format!("{:<40}0 KB\r\n", "notes.txt"));
    }

    #[test]
    fn test_ls_skips_dot_entries() {
        let mut fx = Fixture::new();
        let out = fx.run("ls docs");
        assert!(!out.contains("/.\r\n"));
        assert!(!out.contains("/..\r\n"));
    }

    #[test]
    fn test_ls_missing_dir() {
        let mut fx = Fixture::new();
        let out = fx.run("ls nope");
        assert_eq!(out, "cannot access 'nope': No such file or directory\r\n");
    }

    #[test]
    fn test_ls_too_many_arguments() {
        let mut fx = Fixture::new();
        let before = fx.transfers();
        let out = fx.run("ls a b");
        assert_eq!(out, "invalid arguments\r\n");
        assert_eq!(fx.transfers(), before);
    }

    #[test]
    fn test_cd_argument_count() {
        let mut fx = Fixture::new();
        let before = fx.transfers();
        assert_eq!(fx.run("cd"), "invalid arguments\r\n");
        assert_eq!(fx.run("cd a b"), "invalid arguments\r\n");
        assert_eq!(fx.transfers(), before);
    }

    #[test]
    fn test_cd_then_ls() {
        let mut fx = Fixture::new();
        assert_eq!(fx.run("cd docs"), "");
        assert_eq!(fx.volumes.current_dir().unwrap(), "0:/docs");
        let out = fx.run("ls");
        assert!(out.starts_with("notes.txt"));
    }

    #[test]
    fn test_cd_missing_dir() {
        let mut fx = Fixture::new();
        assert_eq!(fx.run("cd nope"), "nope: No such file or directory\r\n");
        assert_eq!(fx.run("cd big.bin"), "big.bin: No such file or directory\r\n");
        assert_eq!(fx.volumes.current_dir().unwrap(), "0:/");
    }
}

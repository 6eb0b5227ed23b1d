//! msc-explorer - interactive demo over simulated flash drives.
//!
//! Two RAM-backed drives are plugged into a simulated host stack. Keystrokes
//! come from stdin, the shell prints to stdout and log records go to stderr
//! (level chosen at build time with `LOG=debug` and friends).

use core::fmt;
use std::io::{self, Read, Write};

use anyhow::anyhow;
use log::info;
use msc_explorer::MscApp;
use msc_explorer::console;
use msc_explorer::usb::{RamDevice, SimHost};

/// Unbuffered stdout so typed characters are echoed immediately.
struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut out = io::stdout().lock();
        out.write_all(s.as_bytes()).map_err(|_| fmt::Error)?;
        out.flush().map_err(|_| fmt::Error)
    }
}

fn log_print(args: fmt::Arguments) {
    eprint!("{}", args);
}

fn demo_drives() -> anyhow::Result<[RamDevice; 2]> {
    let first = RamDevice::builder()
        .label("MSCDEMO")
        .dir("docs")
        .dir("docs/manuals")
        .dir(".trash")
        .file("readme.txt", b"Plug in a drive, then try 'ls' and 'cd docs'.\r\n")
        .file("docs/notes.txt", &[b'n'; 1500])
        .file("docs/manuals/board.pdf", &[0u8; 64 * 1024])
        .build()
        .map_err(|e| anyhow!("cannot build demo drive: {}", e))?
        .with_inquiry("TinyUSB", "Flash Drive", "1.0");

    let second = RamDevice::builder()
        .geometry(16384, 512)
        .label("PHOTOS")
        .dir("dcim")
        .file("dcim/img_0001.jpg", &[0xffu8; 200 * 1024])
        .build()
        .map_err(|e| anyhow!("cannot build demo drive: {}", e))?
        .with_inquiry("Acme", "Camera Card", "2.10");

    Ok([first, second])
}

/// Run the host stack until no request is outstanding.
fn settle<W: fmt::Write>(app: &mut MscApp<SimHost, W>) {
    loop {
        app.host_task();
        if app.disk().lock().host().in_flight() == 0 {
            break;
        }
    }
}

fn main() -> anyhow::Result<()> {
    console::init_logger(log_print)?;

    let mut host = SimHost::new();
    for (addr, drive) in (1..).zip(demo_drives()?) {
        host.attach(addr, drive)
            .map_err(|e| anyhow!("cannot attach device {}: {}", addr, e))?;
    }

    let mut app = MscApp::new(host, Stdout)?;
    settle(&mut app);
    info!("demo drives mounted, reading stdin");

    let mut stdin = io::stdin().lock();
    let mut buf = [0u8; 64];
    loop {
        let n = stdin.read(&mut buf).map_err(|e| anyhow!("stdin: {}", e))?;
        if n == 0 {
            break;
        }
        app.poll(&buf[..n]);
        settle(&mut app);
    }
    Ok(())
}

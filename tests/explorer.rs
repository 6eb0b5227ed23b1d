//! End-to-end behaviour of the explorer over simulated flash drives.

use msc_explorer::MscApp;
use msc_explorer::config::PROMPT;
use msc_explorer::usb::{RamDevice, SimHost};

type App = MscApp<SimHost, String>;

const README_SIZE: usize = 2500;

fn sample_drive() -> RamDevice {
    RamDevice::builder()
        .dir("docs")
        .dir("docs/drafts")
        .dir(".trash")
        .file("readme.txt", &[b'r'; README_SIZE])
        .file("docs/notes.txt", b"some notes")
        .file("docs/.draft.swp", b"x")
        .build()
        .expect("build sample drive")
}

fn camera_drive() -> RamDevice {
    RamDevice::builder()
        .geometry(16384, 512)
        .dir("dcim")
        .file("dcim/img_0001.jpg", &[0xff; 3000])
        .build()
        .expect("build camera drive")
        .with_inquiry("Acme", "Camera Card", "2.10")
}

fn new_app() -> App {
    let mut app = MscApp::new(SimHost::new(), String::new()).expect("create app");
    take_output(&mut app);
    app
}

fn take_output(app: &mut App) -> String {
    core::mem::take(app.out_mut())
}

/// Run the host stack until no request is outstanding.
fn settle(app: &mut App) {
    loop {
        app.host_task();
        if app.disk().lock().host().in_flight() == 0 {
            break;
        }
    }
}

fn plug(app: &mut App, addr: u8, device: RamDevice) -> String {
    app.disk()
        .lock()
        .host_mut()
        .attach(addr, device)
        .expect("attach");
    settle(app);
    take_output(app)
}

fn unplug(app: &mut App, addr: u8) -> String {
    app.disk().lock().host_mut().detach(addr).expect("detach");
    settle(app);
    take_output(app)
}

/// Type `line` followed by Enter and return what the command printed.
fn run(app: &mut App, line: &str) -> String {
    take_output(app);
    app.poll(format!("{line}\r").as_bytes());
    let out = take_output(app);
    out.strip_prefix(&format!("{line}\r\n"))
        .and_then(|rest| rest.strip_suffix(PROMPT))
        .unwrap_or_else(|| panic!("unexpected terminal output {out:?}"))
        .to_string()
}

fn transfers(app: &App) -> usize {
    app.disk().lock().host().stats().transfers()
}

#[test]
fn test_mount_reports_device_and_enters_root() {
    let mut app = new_app();
    let out = plug(&mut app, 1, sample_drive());
    assert_eq!(
        out,
        "A MassStorage device is mounted\r\n\
         TinyUSB  Mass Storage     rev 1.0 \r\n\
         Disk Size: 4 MB\r\n\
         Block Count = 8192, Block Size: 512\r\n"
    );
    assert!(app.volumes().is_mounted(0));
    assert_eq!(app.volumes().current_dir().unwrap(), "0:/");
}

#[test]
fn test_device_address_selects_drive() {
    let mut app = new_app();
    plug(&mut app, 3, camera_drive());
    assert!(app.volumes().is_mounted(2));
    assert_eq!(app.volumes().current_drive(), Some(2));
    assert_eq!(app.volumes().current_dir().unwrap(), "2:/");
}

#[test]
fn test_ls_lists_root() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    let out = run(&mut app, "ls");
    assert_eq!(out, format!("/docs\r\n{:<40}2 KB\r\n", "readme.txt"));
}

#[test]
fn test_ls_never_lists_dot_entries() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    for line in ["ls", "ls docs", "ls docs/drafts"] {
        let out = run(&mut app, line);
        assert!(
            out.lines().all(|l| !l.starts_with('.') && !l.starts_with("/.")),
            "{line}: {out:?}"
        );
    }
    assert_eq!(run(&mut app, "ls docs/drafts"), "");
}

#[test]
fn test_cd_then_ls_lists_new_directory() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    assert_eq!(run(&mut app, "cd docs"), "");
    assert_eq!(app.volumes().current_dir().unwrap(), "0:/docs");
    assert_eq!(
        run(&mut app, "ls"),
        format!("/drafts\r\n{:<40}0 KB\r\n", "notes.txt")
    );
    assert_eq!(run(&mut app, "cd .."), "");
    assert!(run(&mut app, "ls").starts_with("/docs\r\n"));
}

#[test]
fn test_ls_too_many_arguments_issues_no_transfer() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    let before = transfers(&app);
    assert_eq!(run(&mut app, "ls a b"), "invalid arguments\r\n");
    assert_eq!(transfers(&app), before);
}

#[test]
fn test_cd_argument_count_issues_no_transfer() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    let before = transfers(&app);
    assert_eq!(run(&mut app, "cd"), "invalid arguments\r\n");
    assert_eq!(run(&mut app, "cd a b"), "invalid arguments\r\n");
    assert_eq!(transfers(&app), before);
}

#[test]
fn test_missing_paths() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    assert_eq!(
        run(&mut app, "ls nope"),
        "cannot access 'nope': No such file or directory\r\n"
    );
    assert_eq!(
        run(&mut app, "cd readme.txt"),
        "readme.txt: No such file or directory\r\n"
    );
    assert_eq!(app.volumes().current_dir().unwrap(), "0:/");
}

#[test]
fn test_no_drive_mounted() {
    let mut app = new_app();
    assert_eq!(
        run(&mut app, "ls"),
        "cannot access '.': No such file or directory\r\n"
    );
    assert_eq!(run(&mut app, "cd /"), "/: No such file or directory\r\n");
}

#[test]
fn test_unknown_command() {
    let mut app = new_app();
    assert_eq!(run(&mut app, "dir /w"), "dir: command not found\r\n");
}

#[test]
fn test_long_line_is_fed_through_small_ring() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    let out = run(&mut app, "ls docs/drafts/../../docs");
    assert!(out.contains("notes.txt"));
}

#[test]
fn test_cd_with_drive_prefix_switches_drive() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    plug(&mut app, 2, camera_drive());
    assert_eq!(app.volumes().current_drive(), Some(1));

    assert_eq!(run(&mut app, "cd 0:/docs"), "");
    assert_eq!(app.volumes().current_dir().unwrap(), "0:/docs");
    assert!(run(&mut app, "ls 1:/dcim").contains("img_0001.jpg"));
    assert_eq!(app.volumes().current_drive(), Some(0));
}

#[test]
fn test_each_device_keeps_its_inquiry() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    let out = plug(&mut app, 2, camera_drive());
    assert!(out.contains("Acme     Camera Card      rev 2.10\r\n"));
    assert!(out.contains("Disk Size: 8 MB\r\n"));

    assert_eq!(app.inquiry(1).map(|r| r.vendor()), Some("TinyUSB "));
    assert_eq!(app.inquiry(2).map(|r| r.vendor()), Some("Acme    "));
}

#[test]
fn test_unmount_current_falls_back_to_lowest_drive() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    plug(&mut app, 3, camera_drive());
    assert_eq!(app.volumes().current_drive(), Some(2));

    let out = unplug(&mut app, 3);
    assert_eq!(out, "A MassStorage device is unmounted\r\n");
    assert!(!app.volumes().is_mounted(2));
    assert!(app.inquiry(3).is_none());
    assert_eq!(app.volumes().current_dir().unwrap(), "0:/");
    assert!(run(&mut app, "ls").starts_with("/docs"));

    unplug(&mut app, 1);
    assert_eq!(app.volumes().current_drive(), None);
    assert!(run(&mut app, "ls").starts_with("cannot access"));
}

#[test]
fn test_unmount_other_drive_keeps_current() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    plug(&mut app, 2, camera_drive());
    run(&mut app, "cd 0:/docs");

    unplug(&mut app, 2);
    assert_eq!(app.volumes().current_dir().unwrap(), "0:/docs");
}

#[test]
fn test_replug_mounts_again() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    unplug(&mut app, 1);
    let out = plug(&mut app, 1, camera_drive());
    assert!(out.starts_with("A MassStorage device is mounted\r\n"));
    assert!(run(&mut app, "ls").starts_with("/dcim"));
}

#[test]
fn test_slow_transfers_complete() {
    let mut app = new_app();
    app.disk().lock().host_mut().set_latency(5);
    plug(&mut app, 1, sample_drive());
    assert!(run(&mut app, "ls docs").contains("notes.txt"));
    assert!(!app.disk().lock().is_busy(0));
}

#[test]
fn test_history_recall_runs_previous_command() {
    let mut app = new_app();
    plug(&mut app, 1, sample_drive());
    run(&mut app, "cd docs");
    run(&mut app, "cd ..");

    // Up twice recalls `cd docs`
    app.poll(b"\x1b[A\x1b[A\r");
    assert_eq!(app.volumes().current_dir().unwrap(), "0:/docs");
}

//! The explorer application: host events in, shell out.
//!
//! [`MscApp`] owns everything the main loop touches. A mass-storage device
//! that enumerates is asked for its SCSI inquiry data; once that completes
//! its first LUN is mounted as drive `address - 1` and becomes the current
//! drive. Removing the device unmounts the drive again.

use alloc::sync::Arc;
use core::fmt::Write;

use log::{debug, info, trace, warn};

use crate::ExplorerResult;
use crate::cli::{Cli, commands};
use crate::config::{CliConfig, DEVICE_MAX, MSC_LUN};
use crate::disk::{MscDisk, SharedDisk};
use crate::fs::Volumes;
use crate::sync::Mutex;
use crate::usb::{CswStatus, DeviceAddr, HostEvent, InquiryResponse, MscHost};

pub struct MscApp<H: MscHost + 'static, W: Write> {
    disk: Arc<Mutex<MscDisk<H>>>,
    volumes: Volumes,
    cli: Cli,
    out: W,
    /// Inquiry data of each mounted device, by slot.
    inquiry: [Option<InquiryResponse>; DEVICE_MAX],
}

impl<H: MscHost + 'static, W: Write> MscApp<H, W> {
    pub fn new(host: H, out: W) -> ExplorerResult<Self> {
        Self::with_config(host, out, CliConfig::default())
    }

    /// Set up the interpreter with `help`, `cd` and `ls` bound and print the
    /// first prompt.
    pub fn with_config(host: H, out: W, config: CliConfig) -> ExplorerResult<Self> {
        let mut cli = Cli::new(config)?;
        cli.add_binding(&commands::HELP)?;
        cli.add_binding(&commands::CD)?;
        cli.add_binding(&commands::LS)?;

        let mut app = Self {
            disk: Arc::new(Mutex::new(MscDisk::new(host))),
            volumes: Volumes::new(),
            cli,
            out,
            inquiry: core::array::from_fn(|_| None),
        };
        app.cli.print_prompt(&mut app.out);
        info!("msc explorer ready");
        Ok(app)
    }

    /// Queue one input character for the interpreter.
    pub fn receive_char(&mut self, c: u8) -> bool {
        self.cli.receive_char(c)
    }

    /// Run the interpreter over the queued input.
    pub fn cli_task(&mut self) {
        self.cli.process(&mut self.volumes, &mut self.out);
    }

    /// Run the host stack once and handle the events it produced, along with
    /// any that arrived while a transfer was being waited on.
    pub fn host_task(&mut self) {
        let events = self.disk.lock().task();
        for event in events {
            self.handle_event(event);
        }
    }

    /// One main-loop iteration.
    pub fn poll(&mut self, input: &[u8]) {
        self.host_task();
        for &c in input {
            if self.cli.rx_full() {
                self.cli_task();
            }
            self.cli.receive_char(c);
        }
        self.cli_task();
    }

    pub fn disk(&self) -> &Arc<Mutex<MscDisk<H>>> {
        &self.disk
    }

    pub fn volumes(&self) -> &Volumes {
        &self.volumes
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    pub fn out(&self) -> &W {
        &self.out
    }

    pub fn out_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Inquiry data of the device at `dev_addr`, once it has been mounted.
    pub fn inquiry(&self, dev_addr: DeviceAddr) -> Option<&InquiryResponse> {
        slot_of(dev_addr).and_then(|slot| self.inquiry[slot as usize].as_ref())
    }

    fn handle_event(&mut self, event: HostEvent) {
        let dev_addr = event.dev_addr();
        let Some(drive) = slot_of(dev_addr) else {
            warn!("ignoring event for device {}: {:?}", dev_addr, event);
            return;
        };

        match event {
            HostEvent::Mounted(_) => self.on_mount(dev_addr),
            HostEvent::Unmounted(_) => self.on_unmount(dev_addr, drive),
            HostEvent::InquiryComplete {
                lun,
                status,
                response,
                ..
            } => self.on_inquiry(dev_addr, drive, lun, status, response),
            other => trace!("ignoring stray completion {:?}", other),
        }
    }

    fn on_mount(&mut self, dev_addr: DeviceAddr) {
        crate::outln!(&mut self.out, "A MassStorage device is mounted");

        let submitted = self.disk.lock().host_mut().inquiry(dev_addr, MSC_LUN);
        if let Err(e) = submitted {
            warn!("device {}: inquiry not submitted: {}", dev_addr, e);
            crate::outln!(&mut self.out, "Inquiry failed");
        }
    }

    fn on_inquiry(
        &mut self,
        dev_addr: DeviceAddr,
        drive: u8,
        lun: u8,
        status: CswStatus,
        response: InquiryResponse,
    ) {
        if !status.is_passed() {
            crate::outln!(&mut self.out, "Inquiry failed");
            return;
        }

        crate::outln!(
            &mut self.out,
            "{} {} rev {}",
            response.vendor(),
            response.product(),
            response.revision()
        );

        let (block_count, block_size) = {
            let disk = self.disk.lock();
            let host = disk.host();
            (host.block_count(dev_addr, lun), host.block_size(dev_addr, lun))
        };
        let size_mb = u64::from(block_count) * u64::from(block_size) / (1024 * 1024);
        crate::outln!(&mut self.out, "Disk Size: {} MB", size_mb);
        crate::outln!(
            &mut self.out,
            "Block Count = {}, Block Size: {}",
            block_count,
            block_size
        );
        self.inquiry[drive as usize] = Some(response);

        // only the first LUN of each device is mounted
        let shared: SharedDisk = self.disk.clone();
        if let Err(e) = self.volumes.mount(drive, shared) {
            warn!("drive {}: mount failed: {}", drive, e);
            crate::outln!(&mut self.out, "mount failed");
            return;
        }

        // switch to the new drive, at its root
        if let Err(e) = self
            .volumes
            .change_drive(drive)
            .and_then(|()| self.volumes.change_dir("/"))
        {
            warn!("drive {}: cannot switch to it: {}", drive, e);
        }
        debug!("device {} mounted as drive {}", dev_addr, drive);
    }

    fn on_unmount(&mut self, dev_addr: DeviceAddr, drive: u8) {
        crate::outln!(&mut self.out, "A MassStorage device is unmounted");

        self.inquiry[drive as usize] = None;
        match self.volumes.unmount(drive) {
            Ok(()) => debug!("device {} removed, drive {} unmounted", dev_addr, drive),
            Err(e) => debug!("device {} removed, drive {}: {}", dev_addr, drive, e),
        }
    }
}

/// Slot of a device address, if it has one.
fn slot_of(dev_addr: DeviceAddr) -> Option<u8> {
    (1..=DEVICE_MAX as u8)
        .contains(&dev_addr)
        .then(|| dev_addr - 1)
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;
    use crate::usb::{RamDevice, SimHost};

    #[test]
    fn test_slot_of() {
        assert_eq!(slot_of(0), None);
        assert_eq!(slot_of(1), Some(0));
        assert_eq!(slot_of(DEVICE_MAX as u8), Some(DEVICE_MAX as u8 - 1));
        assert_eq!(slot_of(DEVICE_MAX as u8 + 1), None);
    }

    #[test]
    fn test_new_prints_prompt() {
        let app = MscApp::new(SimHost::new(), String::new()).unwrap();
        assert_eq!(app.out(), "> ");
        assert_eq!(app.cli().registry().len(), 3);
    }

    #[test]
    fn test_new_fails_without_room_for_bindings() {
        let config = CliConfig {
            max_bindings: 2,
            ..CliConfig::default()
        };
        assert!(MscApp::with_config(SimHost::new(), String::new(), config).is_err());
    }

    #[test]
    fn test_mount_flow() {
        let mut host = SimHost::new();
        let device = RamDevice::builder()
            .geometry(8192, 512)
            .dir("docs")
            .build()
            .unwrap()
            .with_inquiry("TinyUSB", "Flash Drive", "1.0");
        host.attach(2, device).unwrap();

        let mut app = MscApp::new(host, String::new()).unwrap();
        app.out_mut().clear();
        app.host_task();
        assert_eq!(app.out(), "A MassStorage device is mounted\r\n");

        app.out_mut().clear();
        app.host_task();
        assert_eq!(
            app.out(),
            "TinyUSB  Flash Drive      rev 1.0 \r\n\
             Disk Size: 4 MB\r\n\
             Block Count = 8192, Block Size: 512\r\n"
        );
        assert!(app.volumes().is_mounted(1));
        assert_eq!(app.volumes().current_drive(), Some(1));
        assert_eq!(app.volumes().current_dir().unwrap(), "1:/");
        assert_eq!(app.inquiry(2).map(|r| r.vendor()), Some("TinyUSB "));
    }

    #[test]
    fn test_failed_inquiry() {
        let mut host = SimHost::new();
        host.attach(1, RamDevice::builder().build().unwrap()).unwrap();
        host.fail_next(1);

        let mut app = MscApp::new(host, String::new()).unwrap();
        app.host_task();
        app.out_mut().clear();
        app.host_task();
        assert_eq!(app.out(), "Inquiry failed\r\n");
        assert!(!app.volumes().is_mounted(0));
        assert!(app.inquiry(1).is_none());
    }

    #[test]
    fn test_blank_medium_reports_mount_failure() {
        let mut host = SimHost::new();
        host.attach(1, RamDevice::new(128, 512)).unwrap();

        let mut app = MscApp::new(host, String::new()).unwrap();
        app.host_task();
        app.host_task();
        assert!(app.out().ends_with("mount failed\r\n"));
        assert_eq!(app.volumes().current_drive(), None);
    }
}

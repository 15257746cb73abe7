//! Port I/O through `/dev/port`
//!
//! Linux exposes the x86 I/O port space as a character device where the file
//! offset is the port number. Access needs root (or `CAP_SYS_RAWIO`).
//! Interrupt masking is not available from user space, so the mask hooks keep
//! their no-op defaults.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use super::PortIo;

/// Default device node.
pub const DEV_PORT: &str = "/dev/port";

/// Port I/O backed by the `/dev/port` device.
#[derive(Debug)]
pub struct DevPort {
    file: File,
}

impl DevPort {
    /// Open the default device node.
    pub fn open() -> std::io::Result<Self> {
        Self::open_path(DEV_PORT)
    }

    /// Open a specific device node.
    pub fn open_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(DevPort { file })
    }
}

impl PortIo for DevPort {
    fn write(&mut self, port: u8, value: u8) {
        if let Err(err) = self.file.write_at(&[value], port as u64) {
            tracing::error!(port, value, %err, "port write failed");
        }
    }

    fn read(&mut self, port: u8) -> u8 {
        let mut buf = [0xFFu8; 1];
        if let Err(err) = self.file.read_at(&mut buf, port as u64) {
            tracing::error!(port, %err, "port read failed");
            return 0xFF;
        }
        buf[0]
    }
}

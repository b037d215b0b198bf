//! GPIO access through the legacy sysfs interface (`/sys/class/gpio`).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::hw_trait::gpio::{Direction, GpioSysfs, ValueFile};
use crate::tracing::prelude::*;

/// [`GpioSysfs`] backed by the real filesystem.
#[derive(Debug, Default)]
pub struct SysfsGpio;

impl SysfsGpio {
    pub fn new() -> Self {
        Self
    }
}

impl GpioSysfs for SysfsGpio {
    type Value = SysfsValue;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write_attr(&mut self, path: &Path, value: &str) -> io::Result<()> {
        // Never create or truncate: these are kernel attributes
        let mut file = OpenOptions::new().write(true).open(path)?;

        // sysfs attributes must be written in one go
        let written = file.write(value.as_bytes())?;
        if written != value.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("wrote {} of {} bytes", written, value.len()),
            ));
        }

        trace!(path = %path.display(), value, "Wrote sysfs attribute");
        Ok(())
    }

    fn open_value(&mut self, path: &Path, direction: Direction) -> io::Result<SysfsValue> {
        let file = OpenOptions::new()
            .read(true)
            .write(direction == Direction::Output)
            .open(path)?;
        Ok(SysfsValue(file))
    }
}

/// An open sysfs `value` file.
#[derive(Debug)]
pub struct SysfsValue(File);

impl ValueFile for SysfsValue {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        FileExt::read_at(&self.0, buf, offset)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        FileExt::write_at(&self.0, buf, offset)
    }

    fn poll_fd(&self) -> Option<BorrowedFd<'_>> {
        Some(self.0.as_fd())
    }
}

//! I2C access through the `i2c-dev` character devices (`/dev/i2c-N`).

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

use crate::error::{Error, Result};
use crate::hw_trait::i2c::I2cBus;

/// `I2C_SLAVE` from `<linux/i2c-dev.h>`
const I2C_SLAVE: u16 = 0x0703;

nix::ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);

/// An `i2c-dev` device bound to one slave address.
#[derive(Debug)]
pub struct I2cDev {
    file: File,
}

impl I2cDev {
    /// Open `path` and bind it to `address`.
    ///
    /// Either step failing is fatal: the bus and address are startup
    /// preconditions of the port, not something to retry.
    pub fn open(path: &Path, address: u16) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::DeviceOpen {
                path: path.to_path_buf(),
                source,
            })?;

        // SAFETY: the descriptor is open and owned by `file`; I2C_SLAVE takes
        // the address by value.
        unsafe { i2c_set_slave(file.as_raw_fd(), address.into()) }
            .map_err(|source| Error::SlaveAddress { address, source })?;

        Ok(Self { file })
    }
}

impl I2cBus for I2cDev {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.file.read(buffer)
    }
}

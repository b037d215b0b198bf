//! I2C slave controller.
//!
//! There is no lifecycle here: the bus device is opened and bound to its
//! slave address once at startup (see [`crate::linux::I2cDev::open`]) and
//! stays that way until the process exits.

use crate::error::{Error, Result};
use crate::hw_trait::i2c::{I2cBus, I2cError, MAX_BLOCK};
use crate::tracing::prelude::*;

pub struct I2cController<B: I2cBus> {
    bus: B,
    address: u16,
}

impl<B: I2cBus> I2cController<B> {
    /// Wrap a bus already bound to `address`.
    pub fn new(bus: B, address: u16) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    /// Write all of `data` in one transfer.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        match self.bus.write(data) {
            Ok(n) if n == data.len() => {
                trace!(addr = %format!("0x{:02x}", self.address), data = ?data, "I2C write");
                Ok(())
            }
            Ok(written) => Err(I2cError::ShortWrite {
                address: self.address,
                expected: data.len(),
                written,
            }
            .into()),
            Err(source) => Err(I2cError::Io {
                op: "write",
                address: self.address,
                len: data.len(),
                source,
            }
            .into()),
        }
    }

    /// Read exactly `len` bytes in one transfer.
    ///
    /// Asking for more than [`MAX_BLOCK`] bytes is a protocol violation and
    /// never reaches the bus.
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > MAX_BLOCK {
            return Err(Error::ReadTooLong {
                len,
                max: MAX_BLOCK,
            });
        }

        let mut buf = vec![0u8; len];
        match self.bus.read(&mut buf) {
            Ok(n) if n == len => {
                trace!(addr = %format!("0x{:02x}", self.address), data = ?buf, "I2C read");
                Ok(buf)
            }
            Ok(read) => Err(I2cError::ShortRead {
                address: self.address,
                expected: len,
                read,
            }
            .into()),
            Err(source) => Err(I2cError::Io {
                op: "read",
                address: self.address,
                len,
                source,
            }
            .into()),
        }
    }
}

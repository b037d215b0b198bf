//! I2C hardware abstraction trait.

use std::io;

/// Largest transfer a single `i2c_read` request may ask for.
///
/// Matches `I2C_SMBUS_BLOCK_MAX` from `<linux/i2c.h>`.
pub const MAX_BLOCK: usize = 32;

/// Recoverable I2C errors, reported to the host as `-1`.
#[derive(Debug, thiserror::Error)]
pub enum I2cError {
    /// Device accepted fewer bytes than requested
    #[error("I2C write (address: 0x{address:X}) of {expected} bytes failed: wrote {written}")]
    ShortWrite {
        address: u16,
        expected: usize,
        written: usize,
    },

    /// Device returned fewer bytes than requested
    #[error("I2C read (address: 0x{address:X}) of {expected} bytes failed: read {read}")]
    ShortRead {
        address: u16,
        expected: usize,
        read: usize,
    },

    /// The transfer syscall itself failed
    #[error("I2C {op} (address: 0x{address:X}) of {len} bytes failed: {source}")]
    Io {
        op: &'static str,
        address: u16,
        len: usize,
        source: io::Error,
    },
}

/// An I2C bus device already bound to one slave address.
pub trait I2cBus {
    /// Issue a single write transfer, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Issue a single read transfer, returning the number of bytes read.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

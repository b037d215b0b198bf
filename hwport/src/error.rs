//! Error types for the port drivers.
//!
//! Errors come in two tiers. Recoverable errors are ordinary hardware
//! trouble: the dispatcher turns them into an error reply and the port keeps
//! serving requests. Everything else is fatal: the host sent something that
//! doesn't match the protocol, or an already-open device stopped behaving
//! like one. Fatal errors travel up to `main` as values and end the process
//! with a non-zero status.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::hw_trait::{GpioError, I2cError};
use crate::protocol::term::TermError;

#[derive(Debug, Error)]
pub enum Error {
    /// Recoverable GPIO failure
    #[error(transparent)]
    Gpio(#[from] GpioError),

    /// Recoverable I2C transfer failure
    #[error(transparent)]
    I2c(#[from] I2cError),

    /// Message decoded but doesn't match any known request
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// Frame payload isn't a valid external term
    #[error("Malformed term: {0}")]
    Term(#[from] TermError),

    /// Fewer bytes moved through a GPIO value file than requested
    #[error("Short {op} on GPIO {pin} value file: {done} of {expected} bytes")]
    ShortTransfer {
        op: &'static str,
        pin: u32,
        done: usize,
        expected: usize,
    },

    /// I/O error on an open GPIO value file
    #[error("GPIO {pin} value {op} failed: {source}")]
    ValueIo {
        op: &'static str,
        pin: u32,
        source: io::Error,
    },

    #[error("Can't get more than {max} bytes at time: {len}")]
    ReadTooLong { len: usize, max: usize },

    #[error("Error opening {}: {source}", path.display())]
    DeviceOpen { path: PathBuf, source: io::Error },

    #[error("ioctl(I2C_SLAVE 0x{address:X}) failed: {source}")]
    SlaveAddress { address: u16, source: nix::Error },

    /// Reading or writing the command channel failed
    #[error("Command channel I/O error: {0}")]
    Channel(#[from] io::Error),
}

impl Error {
    /// Build a protocol violation error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Gpio(_) | Error::I2c(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_errors_are_recoverable() {
        assert!(!Error::from(GpioError::Closed).is_fatal());
        let short = I2cError::ShortWrite {
            address: 0x20,
            expected: 3,
            written: 1,
        };
        assert!(!Error::from(short).is_fatal());
    }

    #[test]
    fn structural_errors_are_fatal() {
        assert!(Error::protocol("unexpected element").is_fatal());
        assert!(Error::ReadTooLong { len: 33, max: 32 }.is_fatal());
        assert!(Error::ShortTransfer {
            op: "read",
            pin: 4,
            done: 0,
            expected: 1
        }
        .is_fatal());
        assert!(Error::from(io::Error::from(io::ErrorKind::BrokenPipe)).is_fatal());
    }
}

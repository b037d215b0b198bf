//! GPIO hardware abstraction trait.

use std::io;
use std::os::fd::BorrowedFd;
use std::path::{Path, PathBuf};

/// GPIO pin value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinValue {
    Low,
    High,
}

impl PinValue {
    /// The ASCII byte sysfs uses for this level in the `value` file.
    pub fn as_byte(self) -> u8 {
        match self {
            PinValue::Low => b'0',
            PinValue::High => b'1',
        }
    }

    /// Anything other than `'1'` reads as low.
    pub fn from_byte(byte: u8) -> Self {
        (byte == b'1').into()
    }
}

impl From<bool> for PinValue {
    fn from(value: bool) -> Self {
        if value { PinValue::High } else { PinValue::Low }
    }
}

impl From<PinValue> for bool {
    fn from(value: PinValue) -> Self {
        matches!(value, PinValue::High)
    }
}

/// GPIO pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    /// Parse the direction atom sent by the host (`input` or `output`).
    pub fn from_atom(atom: &str) -> Option<Self> {
        match atom {
            "input" => Some(Direction::Input),
            "output" => Some(Direction::Output),
            _ => None,
        }
    }

    /// Value written to the sysfs `direction` file.
    pub fn sysfs_value(self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
        }
    }
}

/// Interrupt edge selection, as written to the sysfs `edge` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Rising,
    Falling,
    Both,
}

impl Edge {
    pub fn from_atom(atom: &str) -> Option<Self> {
        match atom {
            "none" => Some(Edge::None),
            "rising" => Some(Edge::Rising),
            "falling" => Some(Edge::Falling),
            "both" => Some(Edge::Both),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Edge::None => "none",
            Edge::Rising => "rising",
            Edge::Falling => "falling",
            Edge::Both => "both",
        }
    }
}

/// Recoverable GPIO errors.
///
/// These are reported back to the host as `{error, ...}` replies; the port
/// keeps running.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// No pin has been opened
    #[error("GPIO is not open")]
    Closed,

    /// Write attempted on a pin that isn't an output
    #[error("GPIO {0} is not configured as an output")]
    NotOutput(u32),

    /// Pin number doesn't fit the sysfs numbering
    #[error("Invalid pin number: {0}")]
    InvalidPin(i64),

    #[error("Invalid direction '{0}' (expected input or output)")]
    InvalidDirection(String),

    #[error("Invalid interrupt mode '{0}' (expected rising, falling, both or none)")]
    InvalidEdge(String),

    /// Writing a sysfs control file failed
    #[error("Error writing '{value}' to {}: {source}", path.display())]
    Sysfs {
        path: PathBuf,
        value: String,
        source: io::Error,
    },

    /// Opening the pin's value file failed
    #[error("Error opening {}: {source}", path.display())]
    OpenValue { path: PathBuf, source: io::Error },
}

/// An open handle to a pin's `value` file.
///
/// Access is positional so the file offset never matters; sysfs wants every
/// read of `value` to start from offset 0.
pub trait ValueFile {
    /// Read into `buf` starting at `offset` (pread).
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Write `buf` starting at `offset` (pwrite).
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Descriptor to poll for `POLLPRI` edge notifications, if there is one.
    fn poll_fd(&self) -> Option<BorrowedFd<'_>>;
}

/// Raw access to the GPIO sysfs control files. No policy lives here.
pub trait GpioSysfs {
    /// Handle type returned by [`GpioSysfs::open_value`].
    type Value: ValueFile;

    /// Whether a control file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Write `value` to a control file in a single write. A short write is an
    /// error.
    fn write_attr(&mut self, path: &Path, value: &str) -> io::Result<()>;

    /// Open a `value` file, read-write for outputs and read-only for inputs.
    fn open_value(&mut self, path: &Path, direction: Direction) -> io::Result<Self::Value>;
}

//! GPIO pin controller.
//!
//! Owns at most one pin and enforces its lifecycle:
//!
//! ```text
//!            open(input)              set_interrupt(edge)
//!  Closed ────────────────▶ Input ───────────────────────▶ InputWithInterrupts
//!    ▲  │    open(output)             ◀───────────────────
//!    │  └─────────────────▶ Output     set_interrupt(none)
//!    │                        │
//!    └──────── release ───────┘   (from any open state)
//! ```
//!
//! The value file stays open for as long as the pin is open, so reads and
//! writes are a single positional syscall. A pin exported by this controller
//! is unexported again on release; a pin that was already exported by
//! someone else is left alone.

use std::os::fd::BorrowedFd;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hw_trait::gpio::{Direction, Edge, GpioError, GpioSysfs, PinValue, ValueFile};
use crate::tracing::prelude::*;

/// Default location of the GPIO sysfs class
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Where the GPIO control files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsLayout {
    root: PathBuf,
}

impl SysfsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn export(&self) -> PathBuf {
        self.root.join("export")
    }

    pub fn unexport(&self) -> PathBuf {
        self.root.join("unexport")
    }

    pub fn direction(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("direction")
    }

    pub fn value(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("value")
    }

    pub fn edge(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("edge")
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }
}

impl Default for SysfsLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

/// Observable lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    Closed,
    Output,
    Input,
    InputWithInterrupts,
}

/// Everything that only exists while a pin is open.
struct OpenPin<V> {
    number: u32,
    value: V,
    owns_export: bool,
    state: PinState,
}

/// Controller for a single GPIO pin.
pub struct GpioController<S: GpioSysfs> {
    sysfs: S,
    layout: SysfsLayout,
    pin: Option<OpenPin<S::Value>>,
}

impl<S: GpioSysfs> GpioController<S> {
    /// Create a controller in the `Closed` state.
    pub fn new(sysfs: S, layout: SysfsLayout) -> Self {
        Self {
            sysfs,
            layout,
            pin: None,
        }
    }

    pub fn state(&self) -> PinState {
        self.pin.as_ref().map_or(PinState::Closed, |pin| pin.state)
    }

    /// Number of the open pin, if any.
    pub fn pin_number(&self) -> Option<u32> {
        self.pin.as_ref().map(|pin| pin.number)
    }

    /// Whether this controller exported the open pin and must unexport it.
    pub fn owns_export(&self) -> Option<bool> {
        self.pin.as_ref().map(|pin| pin.owns_export)
    }

    /// Open and configure `number` as `direction` (`"input"` or `"output"`).
    ///
    /// Any pin already open is released first. If this call exported the pin
    /// and a later step fails, the pin is unexported again before returning.
    pub fn open(&mut self, number: u32, direction: &str) -> Result<()> {
        self.release();

        let value_path = self.layout.value(number);
        let owns_export = if self.sysfs.exists(&value_path) {
            debug!(pin = number, "Pin already exported");
            false
        } else {
            let export = self.layout.export();
            self.write_attr(&export, &number.to_string())?;
            debug!(pin = number, "Exported pin");
            true
        };

        match self.configure(number, direction, &value_path) {
            Ok((direction, value)) => {
                let state = match direction {
                    Direction::Output => PinState::Output,
                    Direction::Input => PinState::Input,
                };
                info!(pin = number, ?state, "Opened GPIO");
                self.pin = Some(OpenPin {
                    number,
                    value,
                    owns_export,
                    state,
                });
                Ok(())
            }
            Err(e) => {
                if owns_export {
                    self.unexport(number);
                }
                Err(e.into())
            }
        }
    }

    fn configure(
        &mut self,
        number: u32,
        direction: &str,
        value_path: &Path,
    ) -> std::result::Result<(Direction, S::Value), GpioError> {
        let direction = Direction::from_atom(direction)
            .ok_or_else(|| GpioError::InvalidDirection(direction.to_owned()))?;

        // Pins that only work one way have no direction file
        let direction_path = self.layout.direction(number);
        if self.sysfs.exists(&direction_path) {
            self.write_attr(&direction_path, direction.sysfs_value())?;
        }

        let value = self
            .sysfs
            .open_value(value_path, direction)
            .map_err(|source| GpioError::OpenValue {
                path: value_path.to_path_buf(),
                source,
            })?;
        Ok((direction, value))
    }

    /// Close the pin, unexporting it if this controller exported it.
    ///
    /// Releasing a closed controller does nothing. Unexport failures are
    /// logged and otherwise ignored; the controller always ends up closed.
    pub fn release(&mut self) {
        let Some(pin) = self.pin.take() else {
            return;
        };

        let OpenPin {
            number,
            value,
            owns_export,
            ..
        } = pin;
        drop(value);

        if owns_export {
            self.unexport(number);
        }
        info!(pin = number, "Released GPIO");
    }

    fn unexport(&mut self, number: u32) {
        let unexport = self.layout.unexport();
        match self.write_attr(&unexport, &number.to_string()) {
            Ok(()) => debug!(pin = number, "Unexported pin"),
            Err(e) => warn!(pin = number, error = %e, "Failed to unexport pin"),
        }
    }

    /// Drive an output pin.
    ///
    /// A short or failed write on the open value file is fatal.
    pub fn write(&mut self, value: PinValue) -> Result<()> {
        let pin = match &self.pin {
            Some(pin) if pin.state == PinState::Output => pin,
            Some(pin) => return Err(GpioError::NotOutput(pin.number).into()),
            None => return Err(GpioError::Closed.into()),
        };

        let buf = [value.as_byte()];
        match pin.value.write_at(&buf, 0) {
            Ok(n) if n == buf.len() => {
                trace!(pin = pin.number, ?value, "Wrote GPIO");
                Ok(())
            }
            Ok(n) => Err(Error::ShortTransfer {
                op: "write",
                pin: pin.number,
                done: n,
                expected: buf.len(),
            }),
            Err(source) => Err(Error::ValueIo {
                op: "write",
                pin: pin.number,
                source,
            }),
        }
    }

    /// Sample the pin level.
    ///
    /// A short or failed read on the open value file is fatal.
    pub fn read(&self) -> Result<PinValue> {
        let pin = self.pin.as_ref().ok_or(GpioError::Closed)?;

        let mut buf = [0u8; 1];
        match pin.value.read_at(&mut buf, 0) {
            Ok(n) if n == buf.len() => Ok(PinValue::from_byte(buf[0])),
            Ok(n) => Err(Error::ShortTransfer {
                op: "read",
                pin: pin.number,
                done: n,
                expected: buf.len(),
            }),
            Err(source) => Err(Error::ValueIo {
                op: "read",
                pin: pin.number,
                source,
            }),
        }
    }

    /// Select which edges raise interrupts (`rising`, `falling`, `both`, or
    /// `none` to stop).
    ///
    /// Only arms the pin; the event loop starts watching it on its next
    /// iteration. On failure the state is left as it was.
    pub fn set_interrupt(&mut self, mode: &str) -> Result<()> {
        let number = self.pin_number().ok_or(GpioError::Closed)?;
        let edge =
            Edge::from_atom(mode).ok_or_else(|| GpioError::InvalidEdge(mode.to_owned()))?;

        let edge_path = self.layout.edge(number);
        self.write_attr(&edge_path, edge.as_str())?;

        if let Some(pin) = self.pin.as_mut() {
            pin.state = match (edge, pin.state) {
                (Edge::None, PinState::InputWithInterrupts) => PinState::Input,
                (Edge::None, state) => state,
                _ => PinState::InputWithInterrupts,
            };
            debug!(pin = number, edge = edge.as_str(), state = ?pin.state, "Set interrupt mode");
        }
        Ok(())
    }

    /// Report the edge behind a `POLLPRI` wakeup.
    ///
    /// The level is sampled now, so `High` reports as rising and `Low` as
    /// falling. Edges that happen between notifications are not told apart.
    pub fn process_interrupt(&mut self) -> Result<Edge> {
        let edge = match self.read()? {
            PinValue::High => Edge::Rising,
            PinValue::Low => Edge::Falling,
        };
        trace!(pin = self.pin_number(), edge = edge.as_str(), "GPIO interrupt");
        Ok(edge)
    }

    /// Descriptor to watch for interrupts, present only while armed.
    pub fn interrupt_fd(&self) -> Option<BorrowedFd<'_>> {
        self.pin
            .as_ref()
            .filter(|pin| pin.state == PinState::InputWithInterrupts)
            .and_then(|pin| pin.value.poll_fd())
    }

    fn write_attr(&mut self, path: &Path, value: &str) -> std::result::Result<(), GpioError> {
        self.sysfs
            .write_attr(path, value)
            .map_err(|source| GpioError::Sysfs {
                path: path.to_path_buf(),
                value: value.to_owned(),
                source,
            })
    }
}

impl<S: GpioSysfs> Drop for GpioController<S> {
    fn drop(&mut self) {
        self.release();
    }
}

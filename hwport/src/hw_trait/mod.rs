//! Hardware abstraction layer traits.
//!
//! The controllers in [`crate::controller`] never touch the filesystem or
//! issue ioctls themselves. They talk to the traits defined here, which are
//! implemented for real Linux devices in [`crate::linux`] and by recording
//! fakes in the unit tests.

pub mod gpio;
pub mod i2c;

// Re-export traits
pub use gpio::{Direction, Edge, GpioError, GpioSysfs, PinValue, ValueFile};
pub use i2c::{I2cBus, I2cError, MAX_BLOCK};

//! Resource controllers.
//!
//! Each controller owns exactly one hardware resource and turns the host's
//! operations into calls on the [`crate::hw_trait`] adapters.

pub mod gpio;
pub mod i2c;

pub use gpio::{GpioController, PinState, SysfsLayout};
pub use i2c::I2cController;

//! Linux implementations of the hardware traits.

pub mod i2cdev;
pub mod sysfs;

pub use i2cdev::I2cDev;
pub use sysfs::{SysfsGpio, SysfsValue};

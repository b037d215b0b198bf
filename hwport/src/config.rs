//! Command-line configuration for the two port executables.
//!
//! The host spawns the ports, so arguments are few. Settings that only
//! matter for testing or unusual boards can also come from the environment.
//!
//! # Environment Variables
//!
//! - `HWPORT_GPIO_SYSFS`: GPIO sysfs class directory (default: `/sys/class/gpio`)
//! - `RUST_LOG`: log filter, see [`crate::tracing`]

use std::path::PathBuf;

use clap::Parser;

use crate::controller::gpio::{SysfsLayout, DEFAULT_SYSFS_ROOT};

/// Highest 10-bit I2C address
pub const MAX_I2C_ADDRESS: u16 = 0x3ff;

/// Erlang port exposing one GPIO pin through sysfs
#[derive(Parser, Debug)]
#[command(name = "gpio_port", version, about, long_about = None)]
pub struct GpioArgs {
    /// GPIO sysfs class directory
    #[arg(long, env = "HWPORT_GPIO_SYSFS", default_value = DEFAULT_SYSFS_ROOT)]
    pub sysfs_root: PathBuf,
}

impl GpioArgs {
    pub fn layout(&self) -> SysfsLayout {
        SysfsLayout::new(&self.sysfs_root)
    }
}

/// Erlang port exposing one I2C slave through i2c-dev
#[derive(Parser, Debug)]
#[command(name = "i2c_port", version, about, long_about = None)]
pub struct I2cArgs {
    /// I2C bus device, e.g. /dev/i2c-1
    pub device: PathBuf,

    /// Slave address: decimal, 0x-prefixed hex, or 0-prefixed octal
    #[arg(value_parser = parse_address)]
    pub address: u16,
}

/// Parse an I2C address the way `strtoul(s, NULL, 0)` would.
pub fn parse_address(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let (digits, radix) = if let Some(hex) = hex {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };

    let address = u32::from_str_radix(digits, radix)
        .map_err(|e| format!("invalid I2C address '{}': {}", s, e))?;
    u16::try_from(address)
        .ok()
        .filter(|&a| a <= MAX_I2C_ADDRESS)
        .ok_or_else(|| {
            format!(
                "I2C address {:#x} out of range (max {:#x})",
                address, MAX_I2C_ADDRESS
            )
        })
}

//! Erlang port drivers for Linux GPIO and I2C.
//!
//! Each port process owns one hardware resource, a GPIO pin exposed through
//! sysfs or an I2C slave on an i2c-dev bus, and serves requests from the
//! host over stdin/stdout using `{packet, 2}` framed external terms. GPIO
//! edge interrupts are pushed to the host on the same channel.
//!
//! Layering, leaf to root:
//!
//! - [`hw_trait`] / [`linux`]: raw sysfs file and ioctl access
//! - [`controller`]: per-resource state machines
//! - [`protocol`] / [`port`]: request decoding and dispatch
//! - [`event_loop`]: the single-threaded poll loop tying it together

pub mod config;
pub mod controller;
pub mod error;
pub mod event_loop;
pub mod hw_trait;
pub mod linux;
pub mod port;
pub mod protocol;
pub mod tracing;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

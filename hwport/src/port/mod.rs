//! Request dispatch.
//!
//! A [`Port`] decodes one inbound term, runs the matching controller
//! operation and produces the reply. Recoverable failures become error
//! replies here; fatal ones are returned as `Err` for the event loop to
//! hand up to `main`.

pub mod gpio;
pub mod i2c;

use std::os::fd::BorrowedFd;

use crate::error::Result;
use crate::protocol::Term;
use crate::tracing::prelude::*;

pub use gpio::GpioPort;
pub use i2c::I2cPort;

pub trait Port {
    /// Handle one request. `Ok(None)` means the request takes no reply.
    fn handle(&mut self, request: Term) -> Result<Option<Term>>;

    /// Descriptor to watch for `POLLPRI`, when the port has one armed.
    fn interrupt_fd(&self) -> Option<BorrowedFd<'_>> {
        None
    }

    /// Called when the interrupt descriptor fires. Returns the event to send.
    fn process_interrupt(&mut self) -> Result<Option<Term>> {
        Ok(None)
    }
}

/// Turn an operation result into a reply term.
///
/// Recoverable errors are logged and replaced by `failure`; fatal errors
/// pass through untouched.
fn reply_or<T>(
    result: Result<T>,
    success: impl FnOnce(T) -> Term,
    failure: impl FnOnce() -> Term,
) -> Result<Term> {
    match result {
        Ok(value) => Ok(success(value)),
        Err(e) if !e.is_fatal() => {
            warn!("{}", e);
            Ok(failure())
        }
        Err(e) => Err(e),
    }
}

//! GPIO port: host requests against one [`GpioController`].

use std::os::fd::BorrowedFd;

use super::{reply_or, Port};
use crate::controller::GpioController;
use crate::error::Result;
use crate::hw_trait::gpio::{GpioError, GpioSysfs, PinValue};
use crate::protocol::message::{self, GpioCall, GpioRequest};
use crate::protocol::Term;
use crate::tracing::prelude::*;

pub struct GpioPort<S: GpioSysfs> {
    controller: GpioController<S>,
}

impl<S: GpioSysfs> GpioPort<S> {
    pub fn new(controller: GpioController<S>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &GpioController<S> {
        &self.controller
    }

    fn init(&mut self, pin: i64, direction: &str) -> Result<()> {
        let pin = u32::try_from(pin).map_err(|_| GpioError::InvalidPin(pin))?;
        self.controller.open(pin, direction)
    }

    fn call(&mut self, op: GpioCall) -> Result<Term> {
        match op {
            GpioCall::Write(value) => reply_or(
                self.controller.write(PinValue::from(value != 0)),
                |()| message::ok(),
                || message::error("gpio_write_failed"),
            ),
            GpioCall::Read => reply_or(
                self.controller.read(),
                |value| Term::Integer(bool::from(value).into()),
                || message::error("gpio_read_failed"),
            ),
            GpioCall::SetInterrupt(mode) => reply_or(
                self.controller.set_interrupt(&mode),
                |()| message::ok(),
                || message::error("gpio_set_int_failed"),
            ),
        }
    }
}

impl<S: GpioSysfs> Port for GpioPort<S> {
    fn handle(&mut self, request: Term) -> Result<Option<Term>> {
        match GpioRequest::try_from(request)? {
            GpioRequest::Init { pin, direction } => {
                debug!(pin, direction = %direction, "init");
                reply_or(
                    self.init(pin, &direction),
                    |()| message::ok(),
                    || message::error("gpio_init_fail"),
                )
                .map(Some)
            }
            GpioRequest::Release => {
                debug!("release");
                self.controller.release();
                Ok(None)
            }
            GpioRequest::Call { token, op } => {
                debug!(token = %token, op = ?op, "call");
                let result = self.call(op)?;
                Ok(Some(message::port_reply(token, result)))
            }
        }
    }

    fn interrupt_fd(&self) -> Option<BorrowedFd<'_>> {
        self.controller.interrupt_fd()
    }

    /// A pin released or disarmed since the wakeup produces no event.
    fn process_interrupt(&mut self) -> Result<Option<Term>> {
        match self.controller.process_interrupt() {
            Ok(edge) => Ok(Some(message::gpio_interrupt(edge))),
            Err(e) if !e.is_fatal() => {
                debug!(error = %e, "Dropping stale interrupt");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

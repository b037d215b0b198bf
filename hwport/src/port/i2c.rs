//! I2C port: host requests against one [`I2cController`].

use super::{reply_or, Port};
use crate::controller::I2cController;
use crate::error::Result;
use crate::hw_trait::i2c::I2cBus;
use crate::protocol::message::I2cRequest;
use crate::protocol::Term;
use crate::tracing::prelude::*;

/// Reply for a successful write
const SUCCESS: i64 = 1;
/// Reply for any failed transfer
const FAILURE: i64 = -1;

pub struct I2cPort<B: I2cBus> {
    controller: I2cController<B>,
}

impl<B: I2cBus> I2cPort<B> {
    pub fn new(controller: I2cController<B>) -> Self {
        Self { controller }
    }
}

impl<B: I2cBus> Port for I2cPort<B> {
    fn handle(&mut self, request: Term) -> Result<Option<Term>> {
        let reply = match I2cRequest::try_from(request)? {
            I2cRequest::Write(data) => {
                debug!(len = data.len(), "i2c_write");
                reply_or(
                    self.controller.write(&data),
                    |()| Term::Integer(SUCCESS),
                    || Term::Integer(FAILURE),
                )?
            }
            I2cRequest::Read(len) => {
                debug!(len, "i2c_read");
                reply_or(
                    self.controller.read(len),
                    Term::Binary,
                    || Term::Integer(FAILURE),
                )?
            }
        };
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::FakeBus;

    fn port(bus: &FakeBus) -> I2cPort<FakeBus> {
        I2cPort::new(I2cController::new(bus.clone(), 0x20))
    }

    fn i2c_write(data: &[u8]) -> Term {
        Term::tuple([Term::atom("i2c_write"), Term::Binary(data.to_vec())])
    }

    fn i2c_read(len: i64) -> Term {
        Term::tuple([Term::atom("i2c_read"), Term::Integer(len)])
    }

    #[test]
    fn write_reports_one_or_minus_one() {
        let bus = FakeBus::new();
        let mut port = port(&bus);

        assert_eq!(
            port.handle(i2c_write(&[1, 2, 3])).unwrap(),
            Some(Term::Integer(1))
        );
        assert_eq!(bus.written(), vec![vec![1, 2, 3]]);

        bus.limit_transfers(2);
        assert_eq!(
            port.handle(i2c_write(&[1, 2, 3])).unwrap(),
            Some(Term::Integer(-1))
        );
    }

    #[test]
    fn read_returns_binary_or_minus_one() {
        let bus = FakeBus::new();
        bus.set_read_data(&[0x12, 0x34]);
        let mut port = port(&bus);

        assert_eq!(
            port.handle(i2c_read(2)).unwrap(),
            Some(Term::Binary(vec![0x12, 0x34]))
        );
        assert_eq!(port.handle(i2c_read(3)).unwrap(), Some(Term::Integer(-1)));
    }

    #[test]
    fn oversized_read_is_fatal() {
        let bus = FakeBus::new();
        let mut port = port(&bus);

        let err = port.handle(i2c_read(33)).unwrap_err();
        assert!(matches!(err, Error::ReadTooLong { .. }));
        assert_eq!(bus.reads(), 0);
    }

    #[test]
    fn unknown_request_is_fatal() {
        let bus = FakeBus::new();
        let mut port = port(&bus);

        let request = Term::tuple([Term::atom("i2c_scan"), Term::Integer(0)]);
        assert!(port.handle(request).unwrap_err().is_fatal());
        assert!(port.interrupt_fd().is_none());
    }
}

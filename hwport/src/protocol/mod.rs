//! Erlang port protocol: framing, term encoding and the request/reply
//! vocabulary.

pub mod codec;
pub mod message;
pub mod term;

pub use codec::PortCodec;
pub use message::{GpioCall, GpioRequest, I2cRequest};
pub use term::{Term, TermError};

//! Framing for the port's command channel.
//!
//! The host opens the port with `{packet, 2}`, so every message in either
//! direction is a 2-byte big-endian length followed by that many bytes of
//! external term format.
//!
//! ```text
//! Frame: [Length:2 BE] [Term:Length]
//! ```

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use super::term::Term;
use crate::error::Error;

/// Size of the length prefix
const HEADER_LEN: usize = 2;

/// Codec turning frames into [`Term`]s and back.
#[derive(Debug, Default)]
pub struct PortCodec;

impl Decoder for PortCodec {
    type Item = Term;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            // Not enough data for length field
            return Ok(None);
        }

        // Peek at length without consuming
        let length = u16::from_be_bytes([src[0], src[1]]) as usize;
        if length == 0 {
            return Err(Error::protocol("Empty frame"));
        }

        let total = HEADER_LEN + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(HEADER_LEN);
        let term = Term::decode(&frame)?;

        trace!(len = length, term = %term, "RX frame");

        Ok(Some(term))
    }
}

impl Encoder<Term> for PortCodec {
    type Error = Error;

    fn encode(&mut self, item: Term, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut payload = BytesMut::new();
        item.encode(&mut payload)?;

        let length = u16::try_from(payload.len()).map_err(|_| {
            Error::protocol(format!("Reply too large for frame: {} bytes", payload.len()))
        })?;

        trace!(len = length, term = %item, "TX frame");

        dst.reserve(HEADER_LEN + payload.len());
        dst.put_u16(length);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

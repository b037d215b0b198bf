//! The port's main loop.
//!
//! One thread, one blocking `poll(2)` with no timeout. The command channel
//! is always watched; the port's interrupt descriptor joins the wait set only
//! while the port reports one (for GPIO: while edge interrupts are armed).
//! Whatever becomes ready is serviced to completion before waiting again, so
//! there is never more than one request in flight.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, OwnedFd};

use bytes::BytesMut;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Error, Result};
use crate::port::Port;
use crate::protocol::{PortCodec, Term};
use crate::tracing::prelude::*;

/// Bytes requested from the channel per read
const READ_CHUNK: usize = 4096;

/// The framed command channel: requests in, replies and events out.
pub struct Channel<R, W> {
    reader: R,
    writer: W,
    codec: PortCodec,
    buffer: BytesMut,
}

impl Channel<File, File> {
    /// Unbuffered channel over the process's stdin and stdout.
    ///
    /// The descriptors are duplicated so nothing sits in std's stdin buffer
    /// where `poll` can't see it.
    pub fn stdio() -> io::Result<Self> {
        let stdin: OwnedFd = io::stdin().as_fd().try_clone_to_owned()?;
        let stdout: OwnedFd = io::stdout().as_fd().try_clone_to_owned()?;
        Ok(Self::new(File::from(stdin), File::from(stdout)))
    }
}

impl<R: Read + AsFd, W: Write> Channel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            codec: PortCodec,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Read whatever the host has sent. Returns `false` once the host has
    /// closed its end.
    fn fill(&mut self) -> Result<bool> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Channel(e)),
            }
        }
    }

    /// Next complete request already in the buffer, if any.
    fn next_request(&mut self) -> Result<Option<Term>> {
        self.codec.decode(&mut self.buffer)
    }

    /// Send one term to the host.
    pub fn send(&mut self, term: Term) -> Result<()> {
        let mut frame = BytesMut::new();
        self.codec.encode(term, &mut frame)?;
        self.writer.write_all(&frame)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// What a single wait reported.
#[derive(Debug, Default, Clone, Copy)]
struct Ready {
    channel: bool,
    interrupt: bool,
}

pub struct EventLoop<P, R, W> {
    port: P,
    channel: Channel<R, W>,
}

impl<P: Port, R: Read + AsFd, W: Write> EventLoop<P, R, W> {
    pub fn new(port: P, channel: Channel<R, W>) -> Self {
        Self { port, channel }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Serve requests until the host closes the channel.
    ///
    /// Returns `Ok(())` on an orderly close and `Err` on the first fatal
    /// error.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let ready = self.wait()?;

            if ready.channel && !self.service_channel()? {
                info!("Command channel closed");
                return Ok(());
            }

            // The requests just handled may have released or disarmed the pin
            if ready.interrupt && self.port.interrupt_fd().is_some() {
                if let Some(event) = self.port.process_interrupt()? {
                    self.channel.send(event)?;
                }
            }
        }
    }

    fn wait(&self) -> Result<Ready> {
        let mut fds = vec![PollFd::new(
            self.channel.reader.as_fd(),
            PollFlags::POLLIN | PollFlags::POLLHUP,
        )];
        if let Some(fd) = self.port.interrupt_fd() {
            fds.push(PollFd::new(fd, PollFlags::POLLPRI));
        }

        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(Error::Channel(e.into())),
            }
        }

        let revents = |i: usize| {
            fds.get(i)
                .and_then(|fd| fd.revents())
                .unwrap_or(PollFlags::empty())
        };
        Ok(Ready {
            channel: revents(0)
                .intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR),
            interrupt: revents(1).contains(PollFlags::POLLPRI),
        })
    }

    /// Read once, then dispatch every complete request in arrival order.
    fn service_channel(&mut self) -> Result<bool> {
        if !self.channel.fill()? {
            return Ok(false);
        }

        while let Some(request) = self.channel.next_request()? {
            trace!(request = %request, "Dispatching");
            if let Some(reply) = self.port.handle(request)? {
                self.channel.send(reply)?;
            }
        }
        Ok(true)
    }
}

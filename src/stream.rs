// Byte-stream contract required from the transport, plus the TCP adapter
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// A connected client as seen by the handler.
///
/// `connected()` stays true while unread bytes remain even if the peer
/// already closed its side, and `available()` never blocks.
pub trait Connection: Write {
    /// Whether the peer is still reachable or unread data remains.
    fn connected(&mut self) -> bool;

    /// Number of bytes that can be read right now without blocking.
    fn available(&mut self) -> usize;

    /// Reads at most `buf.len()` bytes. Only called after `available()`
    /// reported data, so implementations may block briefly.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Tears the connection down. Further calls are no-ops.
    fn stop(&mut self);

    fn is_valid(&self) -> bool {
        true
    }
}

const PROBE_SIZE: usize = 512;

pub struct TcpConnection {
    stream: TcpStream,
    probe: [u8; PROBE_SIZE],
    stopped: bool,
}

impl TcpConnection {
    pub fn new(stream: TcpStream) -> Self {
        TcpConnection { stream, probe: [0u8; PROBE_SIZE], stopped: false }
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.stream.set_write_timeout(dur)
    }

    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.stream.set_nodelay(nodelay)
    }

    /// Peeks without blocking. `Some(0)` means orderly EOF, `None` means the
    /// socket is broken.
    fn peek_nonblocking(&mut self) -> Option<usize> {
        if self.stream.set_nonblocking(true).is_err() {
            return None;
        }
        let res = match self.stream.peek(&mut self.probe) {
            Ok(n) => Some(n),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Some(usize::MAX),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => Some(usize::MAX),
            Err(_) => None,
        };
        if self.stream.set_nonblocking(false).is_err() {
            return None;
        }
        res
    }
}

impl Connection for TcpConnection {
    fn connected(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        !matches!(self.peek_nonblocking(), Some(0) | None)
    }

    fn available(&mut self) -> usize {
        if self.stopped {
            return 0;
        }
        match self.peek_nonblocking() {
            Some(usize::MAX) | Some(0) | None => 0,
            Some(n) => n,
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Write for TcpConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stopped {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "connection stopped"));
        }
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stream.flush()
    }
}

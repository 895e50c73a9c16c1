// Timeout-aware reads from the connection into the request window
use std::thread;
use std::time::Duration;

use crate::context::{RequestClock, Span};
use crate::stream::Connection;
use crate::window::Window;

/// Delay between polls of a connection that has nothing to read.
pub const POLL_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    /// The peer went away before the awaited boundary arrived.
    Disconnected,
    /// The window filled up before the awaited boundary arrived.
    Congested,
    /// The request deadline passed.
    TimedOut,
}

pub type ReadResult<T> = Result<T, ReadFailure>;

/// Returns the length (terminator included) of the next line at the window
/// front, receiving more data if needed.
///
/// A line must leave at least one byte of capacity behind it; a line whose
/// `\n` lands on the last byte of the window is reported as congestion.
pub fn read_line<C: Connection + ?Sized>(
    conn: &mut C,
    win: &mut Window<'_>,
    clock: &RequestClock,
) -> ReadResult<usize> {
    if let Some(i) = win.find(b'\n', win.filled()) {
        return accept_line(win, i + 1);
    }

    while conn.connected() && win.free() > 0 {
        if clock.expired() {
            return Err(ReadFailure::TimedOut);
        }

        let avail = conn.available();
        if avail == 0 {
            tracing::trace!("HTTP: waiting for data");
            thread::sleep(POLL_DELAY);
            continue;
        }

        let scanned = win.filled();
        fill(conn, win, avail)?;
        if let Some(i) = win.data()[scanned..].iter().position(|&b| b == b'\n') {
            return accept_line(win, scanned + i + 1);
        }
    }

    if win.free() == 0 {
        Err(ReadFailure::Congested)
    } else {
        Err(ReadFailure::Disconnected)
    }
}

fn accept_line(win: &Window<'_>, len: usize) -> ReadResult<usize> {
    if len >= win.capacity() {
        return Err(ReadFailure::Congested);
    }
    Ok(len)
}

/// Discards everything up to and including the next `\n`, then moves any
/// bytes received after it to the window front. Used after a line did not
/// fit into the window.
pub fn skip_to_line_end<C: Connection + ?Sized>(
    conn: &mut C,
    win: &mut Window<'_>,
    clock: &RequestClock,
) -> ReadResult<()> {
    if let Some(i) = win.find(b'\n', win.filled()) {
        win.consume(i + 1);
        return Ok(());
    }
    win.clear();
    while conn.connected() {
        if clock.expired() {
            return Err(ReadFailure::TimedOut);
        }

        let avail = conn.available();
        if avail == 0 {
            tracing::trace!("HTTP: waiting for data");
            thread::sleep(POLL_DELAY);
            continue;
        }

        fill(conn, win, avail)?;
        if let Some(i) = win.find(b'\n', win.filled()) {
            win.consume(i + 1);
            return Ok(());
        }
        win.clear();
    }
    Err(ReadFailure::Disconnected)
}

/// Receives exactly `len` body bytes at the window front and retains them.
/// The body plus one terminator byte has to fit into the window.
pub fn read_body<C: Connection + ?Sized>(
    conn: &mut C,
    win: &mut Window<'_>,
    len: usize,
    clock: &RequestClock,
) -> ReadResult<Span> {
    if len.saturating_add(1) > win.capacity() {
        return Err(ReadFailure::Congested);
    }

    while win.filled() < len {
        if !conn.connected() {
            return Err(ReadFailure::Disconnected);
        }
        if clock.expired() {
            return Err(ReadFailure::TimedOut);
        }

        let avail = conn.available();
        if avail == 0 {
            thread::sleep(POLL_DELAY);
            continue;
        }
        fill(conn, win, avail.min(len - win.filled()))?;
    }

    Ok(win.retain(len))
}

/// Reads and throws away `len` body bytes that the request does not keep.
pub fn drain_body<C: Connection + ?Sized>(
    conn: &mut C,
    win: &mut Window<'_>,
    len: usize,
    clock: &RequestClock,
) -> ReadResult<()> {
    let buffered = win.filled().min(len);
    win.consume(buffered);
    let mut remaining = len - buffered;
    if remaining > 0 && win.capacity() == 0 {
        return Err(ReadFailure::Congested);
    }

    while remaining > 0 {
        if !conn.connected() {
            return Err(ReadFailure::Disconnected);
        }
        if clock.expired() {
            return Err(ReadFailure::TimedOut);
        }

        let avail = conn.available();
        if avail == 0 {
            thread::sleep(POLL_DELAY);
            continue;
        }
        let n = fill(conn, win, avail.min(remaining))?;
        win.clear();
        remaining -= n.min(remaining);
    }
    Ok(())
}

/// Reads up to `avail` bytes into the free part of the window.
fn fill<C: Connection + ?Sized>(conn: &mut C, win: &mut Window<'_>, avail: usize) -> ReadResult<usize> {
    let spare = win.spare_mut(avail);
    let want = spare.len();
    match conn.read_bytes(spare) {
        Ok(n) if n <= want => {
            win.commit(n);
            crate::metrics::add_bytes_in(n as u64);
            Ok(n)
        }
        Ok(n) => {
            tracing::warn!(received = n, expected = want, "HTTP: wrong state");
            conn.stop();
            Err(ReadFailure::Disconnected)
        }
        Err(e) => {
            tracing::warn!(error = %e, "HTTP: wrong state");
            conn.stop();
            Err(ReadFailure::Disconnected)
        }
    }
}

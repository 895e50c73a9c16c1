// Floating window over the fixed per-request buffer
use crate::context::Span;

/// A view `[start, end)` into one fixed buffer, of which the first `filled`
/// bytes hold received but unprocessed data.
///
/// The window only ever shrinks. [`consume`](Window::consume) discards bytes
/// from the front and compacts the rest leftward; [`retain`](Window::retain)
/// leaves bytes where they are and moves the front past them so a request
/// view can refer to them later.
pub struct Window<'a> {
    buf: &'a mut [u8],
    start: usize,
    filled: usize,
    end: usize,
}

impl<'a> Window<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        let end = buf.len();
        Window { buf, start: 0, filled: 0, end }
    }

    /// Absolute offset of the window front within the buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Bytes between the front and the end of the window.
    pub fn capacity(&self) -> usize {
        self.end - self.start
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn free(&self) -> usize {
        self.capacity() - self.filled
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.capacity()
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[self.start..self.start + self.filled]
    }

    /// Unfilled tail of the window, at most `max` bytes long.
    pub fn spare_mut(&mut self, max: usize) -> &mut [u8] {
        let from = self.start + self.filled;
        let to = from + max.min(self.free());
        &mut self.buf[from..to]
    }

    /// Marks `n` bytes of the spare area as received.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(n <= self.free());
        self.filled += n.min(self.free());
    }

    /// Index of the first `byte` within the first `limit` buffered bytes.
    pub fn find(&self, byte: u8, limit: usize) -> Option<usize> {
        let limit = limit.min(self.filled);
        self.buf[self.start..self.start + limit].iter().position(|&b| b == byte)
    }

    /// Discards `n` bytes from the front and moves the remainder to the
    /// window start.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.filled);
        let from = self.start + n;
        let to = self.start + self.filled;
        self.buf.copy_within(from..to, self.start);
        self.filled -= n;
    }

    /// Drops every buffered byte.
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    /// Keeps `n` bytes in place and advances the front past them. The
    /// returned span stays valid for the rest of the request.
    pub fn retain(&mut self, n: usize) -> Span {
        let n = n.min(self.capacity());
        let span = Span::new(self.start, n);
        self.start += n;
        self.filled = self.filled.saturating_sub(n);
        span
    }

    /// Hands the buffer back once parsing is finished.
    pub fn into_inner(self) -> &'a mut [u8] {
        self.buf
    }
}

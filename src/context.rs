// Per-request processing state: deadline clock and retained buffer spans
use std::time::{Duration, Instant};

use crate::http::Method;

/// Deadline measured from the moment a request started.
#[derive(Debug, Clone, Copy)]
pub struct RequestClock {
    pub started_at: Instant,
    timeout: Duration,
}

impl RequestClock {
    pub fn start(timeout: Duration) -> Self {
        RequestClock { started_at: Instant::now(), timeout }
    }

    pub fn expired(&self) -> bool {
        self.started_at.elapsed() > self.timeout
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

/// Absolute byte range within the connection buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Span { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Everything the parser learned about the request, as offsets into the
/// buffer. Turned into an [`HttpRequest`](crate::http::HttpRequest) once
/// parsing is done.
#[derive(Debug, Clone)]
pub struct RequestData {
    pub method: Method,
    pub url: Span,
    pub get_parameters: Option<Span>,
    pub post_parameters: Option<Span>,
    pub origin: Option<Span>,
    pub content_length: Option<usize>,
}

impl Default for RequestData {
    fn default() -> Self {
        RequestData {
            method: Method::Get,
            url: Span::new(0, 0),
            get_parameters: None,
            post_parameters: None,
            origin: None,
            content_length: None,
        }
    }
}

// Single-connection request handling: parse, authenticate, dispatch, close
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Http;
use crate::context::{RequestClock, RequestData, Span};
use crate::error::{HandleError, Outcome, ProtocolError, SetupError};
use crate::features::{Credentials, Features, RequestProcessor};
use crate::http::{self, HttpRequest, HttpResponse, Method};
use crate::reader::{self, ReadFailure};
use crate::stream::Connection;
use crate::window::Window;

pub const MIN_BUFFER_SIZE: usize = 64;

const CLOSE_DELAY: Duration = Duration::from_millis(1);
const INTERNAL_ERROR: &[u8] = b"HTTP/1.1 500 Internal Error\r\nConnection: close\r\n\r\n";

/// Handles one connection at a time inside a fixed buffer.
///
/// The buffer is allocated once and reused by every request. A request is
/// read, authenticated and answered within a single [`handle`] call; the
/// connection is closed before the call returns.
///
/// [`handle`]: HttpHandler::handle
pub struct HttpHandler<P> {
    processor: P,
    buffer: Box<[u8]>,
    timeout: Duration,
    defaults: Features,
}

impl<P: RequestProcessor> HttpHandler<P> {
    pub fn new(processor: P, buffer_size: usize, timeout: Duration) -> Result<Self, SetupError> {
        if buffer_size < MIN_BUFFER_SIZE {
            return Err(SetupError::BufferTooSmall { min: MIN_BUFFER_SIZE, actual: buffer_size });
        }
        if timeout.is_zero() {
            return Err(SetupError::ZeroTimeout);
        }
        Ok(HttpHandler {
            processor,
            buffer: vec![0u8; buffer_size].into_boxed_slice(),
            timeout,
            defaults: Features::default(),
        })
    }

    pub fn from_config(cfg: &Http, processor: P) -> Result<Self, SetupError> {
        let handler = HttpHandler::new(processor, cfg.buffer_size, Duration::from_millis(cfg.request_timeout_ms))?
            .with_credentials(cfg.credentials())
            .with_cors(cfg.enable_cors)
            .with_parameter_storage(cfg.store_get_parameters, cfg.store_post_parameters);
        Ok(handler)
    }

    /// Sets Basic-Auth from a `<base64 user:pass>[:realm]` spec; an empty
    /// spec disables authentication.
    pub fn with_authentication(self, spec: &str) -> Self {
        self.with_credentials(Credentials::parse(spec))
    }

    pub fn with_credentials(mut self, creds: Option<Credentials>) -> Self {
        self.defaults.authentication = creds.map(Arc::new);
        self
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.defaults.enable_cors = enable;
        self
    }

    pub fn with_parameter_storage(mut self, get: bool, post: bool) -> Self {
        self.defaults.store_get_parameters = get;
        self.defaults.store_post_parameters = post;
        self
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Entry point for servers that re-offer known clients: only new
    /// clients are served, others are closed right away.
    pub fn handle_client<C: Connection>(&mut self, conn: &mut C, is_new: bool) -> Result<Outcome, HandleError> {
        if !is_new {
            close_connection(conn);
            crate::metrics::inc_ignored();
            return Ok(Outcome::Ignored);
        }
        self.handle(conn)
    }

    /// Reads one request from `conn`, answers it and closes the connection.
    pub fn handle<C: Connection>(&mut self, conn: &mut C) -> Result<Outcome, HandleError> {
        if !conn.is_valid() {
            crate::metrics::inc_ignored();
            return Ok(Outcome::Ignored);
        }

        debug!("HTTP: new client");
        crate::metrics::inc_connections();

        let clock = RequestClock::start(self.timeout);
        let mut features = self.defaults.clone();
        let HttpHandler { processor, buffer, .. } = self;
        let mut win = Window::new(&mut buffer[..]);

        let parsed = read_request(conn, &mut win, &clock, &*processor, &mut features);
        let (data, authenticated) = match parsed {
            Ok(v) => v,
            Err(e) => {
                fail(conn, &e, &clock);
                return Err(e);
            }
        };

        let result = respond(conn, processor, win.into_inner(), &data, &features, authenticated);
        match result {
            Ok(outcome) => {
                close_connection(conn);
                crate::metrics::record_outcome(outcome);
                crate::metrics::record_latency(clock.elapsed_ms() as u64);
                debug!(?outcome, elapsed_ms = clock.elapsed_ms() as u64, "HTTP: client processed");
                Ok(outcome)
            }
            Err(e) => {
                fail(conn, &e, &clock);
                Err(e)
            }
        }
    }
}

fn read_request<C: Connection, P: RequestProcessor>(
    conn: &mut C,
    win: &mut Window<'_>,
    clock: &RequestClock,
    processor: &P,
    features: &mut Features,
) -> Result<(RequestData, bool), HandleError> {
    let mut data = RequestData::default();
    read_request_line(conn, win, clock, processor, features, &mut data)?;
    let authenticated = scan_headers(conn, win, clock, features, &mut data)?;
    read_post_data(conn, win, clock, features, &mut data)?;
    Ok((data, authenticated))
}

/// `METHOD SP URL[?QUERY] SP VERSION CRLF`
///
/// The method and its space are discarded. The URL stays at the window
/// front followed by one terminator slot; the query string is kept after it
/// only when GET parameters are stored. The rest of the line is dropped.
fn read_request_line<C: Connection, P: RequestProcessor>(
    conn: &mut C,
    win: &mut Window<'_>,
    clock: &RequestClock,
    processor: &P,
    features: &mut Features,
    data: &mut RequestData,
) -> Result<(), HandleError> {
    let mut line_len = reader::read_line(conn, win, clock)?;

    let space = win.find(b' ', line_len).ok_or(ProtocolError::MissingSpace)?;
    data.method = Method::from_token(&win.data()[..space]).ok_or(ProtocolError::UnsupportedMethod)?;
    win.consume(space + 1);
    line_len -= space + 1;

    let space = win.find(b' ', line_len).ok_or(ProtocolError::MissingSpace)?;
    let qm = win.find(b'?', space);
    let url_len = qm.unwrap_or(space);
    data.url = Span::new(win.start(), url_len);

    {
        let url = std::str::from_utf8(&win.data()[..url_len]).map_err(|_| ProtocolError::InvalidEncoding)?;
        processor.resolve_features(url, features);
        debug!(method = %data.method, url, "HTTP: requested url");
    }

    // Preflights carry nothing worth keeping; only POST has form data.
    if data.method == Method::Options {
        features.store_get_parameters = false;
    }
    if data.method != Method::Post {
        features.store_post_parameters = false;
    }

    let retained = match qm {
        Some(qm) if features.store_get_parameters => {
            data.get_parameters = Some(Span::new(win.start() + qm + 1, space - qm - 1));
            space + 1
        }
        _ => url_len + 1,
    };
    win.retain(retained);
    line_len -= retained;
    win.consume(line_len);
    Ok(())
}

/// Consumes header lines up to the blank line. Returns whether the request
/// is authenticated.
///
/// Only four headers matter. A line that overflows the window is skipped
/// unless it is one of those, in which case the request fails: dropping an
/// `Authorization` or `Origin` line would change the answer.
fn scan_headers<C: Connection>(
    conn: &mut C,
    win: &mut Window<'_>,
    clock: &RequestClock,
    features: &mut Features,
    data: &mut RequestData,
) -> Result<bool, HandleError> {
    let mut authenticated = features.authentication.is_none();

    loop {
        // CRLF plus one spare byte
        if win.capacity() < 3 {
            return Err(HandleError::BufferCongested);
        }

        let line = match reader::read_line(conn, win, clock) {
            Ok(n) => Some(n),
            Err(ReadFailure::Congested) => None,
            Err(e) => return Err(e.into()),
        };

        if line == Some(2) && win.data()[0] == b'\r' {
            win.consume(2);
            break;
        }

        let scan = line.unwrap_or(win.filled());
        let Some(colon) = win.find(b':', scan) else {
            return Err(match line {
                Some(_) => ProtocolError::MalformedHeader.into(),
                None => HandleError::BufferCongested,
            });
        };

        let name = &win.data()[..=colon];
        let mut remaining = line;
        let mut important_missed = false;

        if name == http::HEADER_AUTHORIZATION {
            if let Some(creds) = &features.authentication {
                match line {
                    Some(n) => authenticated = creds.verify(&win.data()[..n]),
                    None => important_missed = true,
                }
            }
        } else if name == http::HEADER_ORIGIN {
            if features.enable_cors {
                match line {
                    Some(n) => {
                        let (span, rest) = take_origin(win, colon, n)?;
                        data.origin = Some(span);
                        remaining = Some(rest);
                    }
                    None => important_missed = true,
                }
            }
        } else if name == http::HEADER_CONTENT_LENGTH {
            if data.content_length.is_none() {
                match line {
                    Some(n) => {
                        let value = http::skip_spaces(&win.data()[colon + 1..n]);
                        data.content_length = http::parse_decimal(value)?;
                    }
                    None => important_missed = true,
                }
            }
        } else if name == http::HEADER_CONTENT_TYPE && features.store_post_parameters {
            match line {
                Some(n) => {
                    let value = http::skip_spaces(&win.data()[colon + 1..n]);
                    if !value.starts_with(http::FORM_URLENCODED) {
                        features.store_post_parameters = false;
                    }
                }
                None => important_missed = true,
            }
        }

        if important_missed {
            return Err(HandleError::BufferCongested);
        }

        match remaining {
            Some(n) => win.consume(n),
            None => reader::skip_to_line_end(conn, win, clock)?,
        }
    }

    Ok(authenticated)
}

/// Moves the `Origin` value out of the line and keeps it, plus one
/// terminator slot, in front of the window. Returns the value span and the
/// number of line bytes still to be consumed.
fn take_origin(win: &mut Window<'_>, colon: usize, line_len: usize) -> Result<(Span, usize), HandleError> {
    let spaces = win.data()[colon + 1..line_len].iter().take_while(|&&b| b == b' ').count();
    let skip = colon + 1 + spaces;
    win.consume(skip);

    let rest = line_len - skip;
    let value_len = win.data()[..rest]
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(rest);
    std::str::from_utf8(&win.data()[..value_len]).map_err(|_| ProtocolError::InvalidEncoding)?;

    let span = win.retain(value_len);
    let slot = win.retain(1).len;
    Ok((span, rest - value_len - slot))
}

fn read_post_data<C: Connection>(
    conn: &mut C,
    win: &mut Window<'_>,
    clock: &RequestClock,
    features: &Features,
    data: &mut RequestData,
) -> Result<(), HandleError> {
    let Some(len) = data.content_length.filter(|&n| n > 0) else {
        return Ok(());
    };

    if features.store_post_parameters {
        data.post_parameters = Some(reader::read_body(conn, win, len, clock)?);
    } else {
        reader::drain_body(conn, win, len, clock)?;
    }
    Ok(())
}

fn respond<C: Connection, P: RequestProcessor>(
    conn: &mut C,
    processor: &mut P,
    buf: &mut [u8],
    data: &RequestData,
    features: &Features,
    authenticated: bool,
) -> Result<Outcome, HandleError> {
    let mut request = HttpRequest::from_buffer(buf, data).ok_or(ProtocolError::InvalidEncoding)?;
    let origin = request.origin();
    let mut response = HttpResponse::new(conn, origin, features.authentication.is_some());

    if !authenticated {
        if data.method != Method::Options {
            info!(url = request.url(), "HTTP: 401 Unauthorized");
            response.set_status(401, "Unauthorized")?;
        } else {
            debug!(url = request.url(), "HTTP: OPTIONS");
        }
        if let (Some(creds), Some(w)) = (&features.authentication, response.header_writer()?) {
            write!(w, "WWW-Authenticate: Basic realm=\"{}\"\r\n", creds.realm())?;
        }
        response.start_content(None)?;
        return Ok(Outcome::Unauthorized);
    }

    let outcome = if data.method == Method::Options {
        Outcome::Preflight
    } else {
        processor.process_request(&mut request, &mut response)?;
        Outcome::Processed
    };
    response.start_content(None)?;
    Ok(outcome)
}

/// Reports a failed request, answers `500` when the client can still hear
/// it, and closes the connection.
fn fail<C: Connection + ?Sized>(conn: &mut C, err: &HandleError, clock: &RequestClock) {
    warn!(
        code = err.code(),
        reason = err.reason(),
        elapsed_ms = clock.elapsed_ms() as u64,
        "HTTP: {err}"
    );
    crate::metrics::record_failure(err);
    crate::metrics::record_latency(clock.elapsed_ms() as u64);

    if !err.allows_response() || !conn.connected() {
        conn.stop();
        return;
    }
    let _ = conn.write_all(INTERNAL_ERROR);
    close_connection(conn);
}

fn close_connection<C: Connection + ?Sized>(conn: &mut C) {
    let _ = conn.flush();
    thread::sleep(CLOSE_DELAY);
    conn.stop();
}

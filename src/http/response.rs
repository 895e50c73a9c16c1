// Streaming response builder with monotonic status/header/content progression
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResponseState {
    NoStatus,
    StatusSent,
    HeadersClosed,
}

/// Writes a response straight to the connection.
///
/// The first status wins; a `200 OK` is sent implicitly by the first header
/// or content write. Status and header calls after the header section was
/// closed are ignored. Nothing is buffered.
pub struct HttpResponse<'a> {
    out: &'a mut dyn Write,
    allow_origin: Option<&'a str>,
    allow_credentials: bool,
    state: ResponseState,
}

impl<'a> HttpResponse<'a> {
    /// `allow_origin` is echoed as `Access-Control-Allow-Origin`;
    /// `allow_credentials` adds the credentialed CORS headers next to it.
    pub fn new(out: &'a mut dyn Write, allow_origin: Option<&'a str>, allow_credentials: bool) -> Self {
        HttpResponse { out, allow_origin, allow_credentials, state: ResponseState::NoStatus }
    }

    pub fn state(&self) -> ResponseState {
        self.state
    }

    pub fn set_status(&mut self, code: u16, reason: &str) -> io::Result<()> {
        if self.state != ResponseState::NoStatus {
            return Ok(());
        }
        write!(self.out, "HTTP/1.1 {code} {reason}\r\n")?;
        self.state = ResponseState::StatusSent;
        Ok(())
    }

    /// Status with its canonical reason phrase.
    pub fn set_status_code(&mut self, code: u16) -> io::Result<()> {
        let reason = ::http::StatusCode::from_u16(code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        self.set_status(code, reason)
    }

    pub fn header(&mut self, name: &str, value: &str) -> io::Result<()> {
        if self.state == ResponseState::HeadersClosed {
            return Ok(());
        }
        self.ensure_status()?;
        write!(self.out, "{name}: {value}\r\n")
    }

    /// Raw access to the header section for headers composed on the fly.
    /// Each header written must end with CRLF. `None` once headers are closed.
    pub fn header_writer(&mut self) -> io::Result<Option<&mut dyn Write>> {
        if self.state == ResponseState::HeadersClosed {
            return Ok(None);
        }
        self.ensure_status()?;
        Ok(Some(&mut *self.out))
    }

    /// Closes the header section (after an optional `Content-Type`) and
    /// returns the sink for the body.
    pub fn start_content(&mut self, content_type: Option<&str>) -> io::Result<&mut dyn Write> {
        if self.state != ResponseState::HeadersClosed {
            if let Some(ct) = content_type {
                self.header("Content-Type", ct)?;
            }
            self.close_headers()?;
        }
        Ok(&mut *self.out)
    }

    fn ensure_status(&mut self) -> io::Result<()> {
        if self.state == ResponseState::NoStatus {
            self.set_status(200, "OK")?;
        }
        Ok(())
    }

    fn close_headers(&mut self) -> io::Result<()> {
        self.ensure_status()?;
        if let Some(origin) = self.allow_origin {
            self.header("Access-Control-Allow-Origin", origin)?;
            if self.allow_credentials {
                self.header("Access-Control-Allow-Credentials", "true")?;
                self.header("Access-Control-Allow-Headers", "Authorization")?;
            }
        }
        self.out.write_all(b"Connection: close\r\n\r\n")?;
        self.state = ResponseState::HeadersClosed;
        Ok(())
    }
}

// Read-only view of a parsed request, borrowed from the connection buffer
use std::fmt;

use super::query::{Parameter, Params};
use crate::context::{RequestData, Span};

/// Request methods the handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Options,
}

impl Method {
    /// Matches the method token of a request line exactly.
    pub fn from_token(token: &[u8]) -> Option<Method> {
        match token {
            b"GET" => Some(Method::Get),
            b"POST" => Some(Method::Post),
            b"OPTIONS" => Some(Method::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for ::http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => ::http::Method::GET,
            Method::Post => ::http::Method::POST,
            Method::Options => ::http::Method::OPTIONS,
        }
    }
}

/// The request as handed to a processor. Valid only while the processor
/// runs; every borrowed part lives in the handler's buffer.
pub struct HttpRequest<'a> {
    method: Method,
    url: &'a str,
    origin: Option<&'a str>,
    content_length: Option<usize>,
    get_params: Params<'a>,
    post_params: Params<'a>,
}

impl<'a> HttpRequest<'a> {
    pub fn new(
        method: Method,
        url: &'a str,
        query: Option<&'a mut [u8]>,
        body: Option<&'a mut [u8]>,
        origin: Option<&'a str>,
        content_length: Option<usize>,
    ) -> Self {
        HttpRequest {
            method,
            url,
            origin,
            content_length,
            get_params: query.map(Params::new).unwrap_or_else(Params::empty),
            post_params: body.map(Params::new).unwrap_or_else(Params::empty),
        }
    }

    /// Splits `buf` along the spans recorded while parsing.
    ///
    /// Spans are carved in buffer order (url, query, origin, body), which
    /// is the order the parser retains them in.
    pub fn from_buffer(buf: &'a mut [u8], data: &RequestData) -> Option<Self> {
        let mut carver = Carver { rest: buf, offset: 0 };
        let url = std::str::from_utf8(carver.take(data.url)?).ok()?;
        let query = match data.get_parameters {
            Some(s) => Some(carver.take(s)?),
            None => None,
        };
        let origin = match data.origin {
            Some(s) => Some(std::str::from_utf8(carver.take(s)?).ok()?),
            None => None,
        };
        let body = match data.post_parameters {
            Some(s) => Some(carver.take(s)?),
            None => None,
        };
        Some(HttpRequest::new(data.method, url, query, body, origin, data.content_length))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Requested path without the query string.
    pub fn url(&self) -> &'a str {
        self.url
    }

    pub fn url_starts_with(&self, prefix: &str) -> bool {
        self.url.starts_with(prefix)
    }

    /// `Origin` header, captured only when CORS is enabled.
    pub fn origin(&self) -> Option<&'a str> {
        self.origin
    }

    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    pub fn has_get_parameters(&self) -> bool {
        self.get_params.has_next()
    }

    pub fn has_post_parameters(&self) -> bool {
        self.post_params.has_next()
    }

    pub fn next_get_parameter(&mut self) -> Option<Parameter<'a>> {
        self.get_params.next()
    }

    pub fn next_post_parameter(&mut self) -> Option<Parameter<'a>> {
        self.post_params.next()
    }

    /// The query string parameters. Decoding is destructive and single pass:
    /// parameters already produced are not produced again.
    pub fn get_parameters(&mut self) -> &mut Params<'a> {
        &mut self.get_params
    }

    /// The form body parameters, with the same single-pass contract.
    pub fn post_parameters(&mut self) -> &mut Params<'a> {
        &mut self.post_params
    }
}

struct Carver<'a> {
    rest: &'a mut [u8],
    offset: usize,
}

impl<'a> Carver<'a> {
    fn take(&mut self, span: Span) -> Option<&'a mut [u8]> {
        let skip = span.start.checked_sub(self.offset)?;
        if skip + span.len > self.rest.len() {
            return None;
        }
        let buf = std::mem::take(&mut self.rest);
        let (_, tail) = buf.split_at_mut(skip);
        let (piece, tail) = tail.split_at_mut(span.len);
        self.rest = tail;
        self.offset = span.end();
        Some(piece)
    }
}

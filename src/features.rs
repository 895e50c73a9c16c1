// Per-request feature set, Basic-Auth credentials and the processor seam
use std::io;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};

use crate::http::{HttpRequest, HttpResponse};

pub const DEFAULT_REALM: &str = "web";

/// Basic-Auth settings in the form `<base64 user:pass>[:realm]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    spec: String,
    token_len: usize,
}

impl Credentials {
    /// Parses a credential spec. An empty spec means "no authentication".
    pub fn parse(spec: &str) -> Option<Self> {
        if spec.is_empty() {
            return None;
        }
        let token_len = spec.find(':').unwrap_or(spec.len());
        Some(Credentials { spec: spec.to_string(), token_len })
    }

    /// Builds the spec from a plain user and password.
    pub fn from_user_password(user: &str, password: &str, realm: Option<&str>) -> Self {
        let mut spec = general_purpose::STANDARD.encode(format!("{user}:{password}"));
        let token_len = spec.len();
        if let Some(r) = realm.filter(|r| !r.is_empty()) {
            spec.push(':');
            spec.push_str(r);
        }
        Credentials { spec, token_len }
    }

    pub fn token(&self) -> &str {
        &self.spec[..self.token_len]
    }

    /// Everything after the first colon of the spec, or `web`.
    pub fn realm(&self) -> &str {
        if self.token_len < self.spec.len() {
            &self.spec[self.token_len + 1..]
        } else {
            DEFAULT_REALM
        }
    }

    /// Checks a raw `Authorization:` header line against the token.
    ///
    /// The received token has to end right where the configured one ends
    /// (at CR, LF or the end of the line), so a longer token that merely
    /// starts with the right bytes is rejected.
    pub fn verify(&self, line: &[u8]) -> bool {
        let mut rest = match line.iter().position(|&b| b == b':') {
            Some(colon) => &line[colon + 1..],
            None => &[][..],
        };
        while let [b' ', tail @ ..] = rest {
            rest = tail;
        }

        let Some(received) = rest.strip_prefix(b"Basic ") else {
            return false;
        };
        let Some(after) = received.strip_prefix(self.token().as_bytes()) else {
            return false;
        };
        matches!(after.first(), None | Some(b'\r') | Some(b'\n'))
    }
}

/// Processing features applied to one request. Starts from the handler
/// defaults and may be adjusted per URL by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Features {
    /// Keep the query string for parameter decoding.
    pub store_get_parameters: bool,
    /// Keep a form-encoded body for parameter decoding.
    pub store_post_parameters: bool,
    pub authentication: Option<Arc<Credentials>>,
    pub enable_cors: bool,
}

impl Default for Features {
    fn default() -> Self {
        Features {
            store_get_parameters: true,
            store_post_parameters: true,
            authentication: None,
            enable_cors: false,
        }
    }
}

/// Application logic plugged into the handler.
pub trait RequestProcessor {
    /// Called once the URL is known, before anything else is buffered.
    fn resolve_features(&self, _url: &str, _features: &mut Features) {}

    /// Produces the response for an authenticated, non-OPTIONS request.
    /// Anything the processor leaves unsent is completed by the handler.
    fn process_request(
        &mut self,
        request: &mut HttpRequest<'_>,
        response: &mut HttpResponse<'_>,
    ) -> io::Result<()>;
}

impl<T: RequestProcessor + ?Sized> RequestProcessor for Box<T> {
    fn resolve_features(&self, url: &str, features: &mut Features) {
        (**self).resolve_features(url, features)
    }

    fn process_request(
        &mut self,
        request: &mut HttpRequest<'_>,
        response: &mut HttpResponse<'_>,
    ) -> io::Result<()> {
        (**self).process_request(request, response)
    }
}

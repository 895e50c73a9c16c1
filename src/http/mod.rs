// HTTP wire-level types: request view, parameter decoding, response builder
mod query;
mod request;
mod response;

use crate::error::ProtocolError;

pub use query::{Parameter, Params};
pub use request::{HttpRequest, Method};
pub use response::{HttpResponse, ResponseState};

pub const HEADER_AUTHORIZATION: &[u8] = b"Authorization:";
pub const HEADER_ORIGIN: &[u8] = b"Origin:";
pub const HEADER_CONTENT_LENGTH: &[u8] = b"Content-Length:";
pub const HEADER_CONTENT_TYPE: &[u8] = b"Content-Type:";

pub const FORM_URLENCODED: &[u8] = b"application/x-www-form-urlencoded";

pub fn skip_spaces(d: &[u8]) -> &[u8] {
    let n = d.iter().take_while(|&&b| b == b' ').count();
    &d[n..]
}

/// Decimal digits at the start of `d`. `Ok(None)` when there are none.
pub fn parse_decimal(d: &[u8]) -> Result<Option<usize>, ProtocolError> {
    let mut value: Option<usize> = None;
    for &b in d.iter().take_while(|b| b.is_ascii_digit()) {
        let digit = (b - b'0') as usize;
        value = Some(
            value.unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or(ProtocolError::InvalidContentLength)?,
        );
    }
    Ok(value)
}

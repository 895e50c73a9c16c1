// In-place decoding of url-encoded parameter strings
use std::fmt;

/// One decoded `name=value` pair. Both parts borrow the request buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Parameter<'a> {
    name: &'a [u8],
    value: &'a [u8],
}

impl<'a> Parameter<'a> {
    pub fn name(&self) -> &'a [u8] {
        self.name
    }

    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Name as text, if it decoded to valid UTF-8.
    pub fn name_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.value).ok()
    }

    pub fn name_equals(&self, name: &str) -> bool {
        self.name == name.as_bytes()
    }
}

impl fmt::Debug for Parameter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Parameter")
            .field(&String::from_utf8_lossy(self.name))
            .field(&String::from_utf8_lossy(self.value))
            .finish()
    }
}

/// Single-pass decoder over a url-encoded parameter string.
///
/// Decoding rewrites the bytes it walks over: each parameter is compacted
/// to the front of the region it was read from, so the original encoded
/// text is gone once a parameter has been produced. The iterator cannot be
/// rewound; iterate it once, to the end.
pub struct Params<'a> {
    rest: &'a mut [u8],
}

impl<'a> Params<'a> {
    pub fn new(encoded: &'a mut [u8]) -> Self {
        Params { rest: encoded }
    }

    pub fn empty() -> Self {
        Params { rest: &mut [] }
    }

    /// Whether undecoded bytes remain.
    pub fn has_next(&self) -> bool {
        !self.rest.is_empty()
    }
}

impl<'a> Iterator for Params<'a> {
    type Item = Parameter<'a>;

    fn next(&mut self) -> Option<Parameter<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let (consumed, name_len, written) = decode_next(self.rest);
        let buf = std::mem::take(&mut self.rest);
        let (head, tail) = buf.split_at_mut(consumed);
        self.rest = tail;

        let head: &'a [u8] = head;
        Some(Parameter { name: &head[..name_len], value: &head[name_len..written] })
    }
}

/// Decodes the parameter at the front of `s` in place.
///
/// Returns `(consumed, name_len, written)`: the number of input bytes used
/// (trailing `&` separators included), and the decoded name and name+value
/// lengths. The write cursor never passes the read cursor.
fn decode_next(s: &mut [u8]) -> (usize, usize, usize) {
    let mut r = 0;
    let mut w = 0;
    let mut name_len: Option<usize> = None;

    while r < s.len() && s[r] != b'&' {
        match s[r] {
            b'%' => {
                r += 1;
                let Some(hi) = s.get(r).copied().and_then(hex_value) else {
                    continue;
                };
                r += 1;
                let Some(lo) = s.get(r).copied().and_then(hex_value) else {
                    continue;
                };
                r += 1;
                s[w] = hi * 16 + lo;
                w += 1;
            }
            b'+' => {
                s[w] = b' ';
                w += 1;
                r += 1;
            }
            b'=' if name_len.is_none() => {
                name_len = Some(w);
                r += 1;
            }
            c => {
                s[w] = c;
                w += 1;
                r += 1;
            }
        }
    }

    while r < s.len() && s[r] == b'&' {
        r += 1;
    }

    (r, name_len.unwrap_or(w), w)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

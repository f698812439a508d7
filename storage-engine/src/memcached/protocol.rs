use bytes::{BufMut, Bytes, BytesMut};
use shared::{Error, Result};
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::codec::{Decoder, Encoder};

pub const MAX_KEY_LEN: usize = 250;

/// Relative expirations above this many seconds are read by the server as
/// unix timestamps.
pub const MAX_RELATIVE_EXPTIME: u64 = 60 * 60 * 24 * 30;

// Longest response line we accept before giving up on finding CRLF
const MAX_LINE_LEN: usize = 8 * 1024;

/// Largest `VALUE` payload accepted from the server. Memcached's item size
/// limit is 1 MiB by default and can be raised with `-I`.
pub const MAX_VALUE_LEN: usize = 128 * 1024 * 1024;

const CRLF: &[u8] = b"\r\n";
const VALUE_TRAILER: &[u8] = b"\r\nEND\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Set { key: String, exptime: u32, value: Bytes },
    Get { key: String },
    Delete { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Stored,
    NotStored,
    Value(Bytes),
    /// `END` without a preceding `VALUE`.
    Miss,
    Deleted,
    NotFound,
    Error,
    ClientError(String),
    ServerError(String),
}

impl Response {
    /// Turn a response the caller did not expect into a backend error.
    pub fn into_error(self, op: &str) -> Error {
        match self {
            Response::Error => Error::Backend(format!("memcached {op}: unknown command")),
            Response::ClientError(msg) => Error::Backend(format!("memcached {op}: client error: {msg}")),
            Response::ServerError(msg) => Error::Backend(format!("memcached {op}: server error: {msg}")),
            other => Error::Backend(format!("memcached {op}: unexpected response {other:?}")),
        }
    }
}

/// Keys are 1..=250 bytes with no whitespace or control characters.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::backend("memcached key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(Error::Backend(format!(
            "memcached key is {} bytes, limit is {MAX_KEY_LEN}",
            key.len()
        )));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::Backend(format!(
            "memcached key {key:?} contains whitespace or control characters"
        )));
    }
    Ok(())
}

/// Expiration field for `set`: whole seconds rounded up, 0 for no expiry, and
/// an absolute timestamp once the TTL exceeds thirty days.
pub fn exptime(ttl: Duration, now: SystemTime) -> u32 {
    if ttl.is_zero() {
        return 0;
    }

    let mut secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs += 1;
    }

    if secs > MAX_RELATIVE_EXPTIME {
        let now = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        secs = now.saturating_add(secs);
    }

    u32::try_from(secs).unwrap_or(u32::MAX)
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Length field of a `VALUE <key> <flags> <bytes> [<cas>]` header.
fn value_len(header: &[u8]) -> io::Result<usize> {
    let header = std::str::from_utf8(header).map_err(|_| invalid_data("VALUE header is not UTF-8"))?;
    header
        .split(' ')
        .nth(3)
        .and_then(|len| len.parse().ok())
        .ok_or_else(|| invalid_data(format!("malformed VALUE header {header:?}")))
}

/// Text-protocol codec for the three commands the adapter issues.
#[derive(Debug, Default)]
pub struct MemcachedCodec;

impl Encoder<Request> for MemcachedCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> io::Result<()> {
        match item {
            Request::Set { key, exptime, value } => {
                let header = format!("set {key} 0 {exptime} {}\r\n", value.len());
                dst.reserve(header.len() + value.len() + CRLF.len());
                dst.put_slice(header.as_bytes());
                dst.put_slice(&value);
                dst.put_slice(CRLF);
            }
            Request::Get { key } => {
                dst.put_slice(format!("get {key}\r\n").as_bytes());
            }
            Request::Delete { key } => {
                dst.put_slice(format!("delete {key}\r\n").as_bytes());
            }
        }
        Ok(())
    }
}

impl Decoder for MemcachedCodec {
    type Item = Response;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Response>> {
        let Some(line_end) = find_crlf(src) else {
            if src.len() > MAX_LINE_LEN {
                return Err(invalid_data("response line too long"));
            }
            return Ok(None);
        };

        if src.starts_with(b"VALUE ") {
            let len = value_len(&src[..line_end])?;
            if len > MAX_VALUE_LEN {
                return Err(invalid_data(format!(
                    "VALUE of {len} bytes exceeds limit of {MAX_VALUE_LEN}"
                )));
            }
            let header_len = line_end + CRLF.len();
            let frame_len = header_len
                .checked_add(len)
                .and_then(|n| n.checked_add(VALUE_TRAILER.len()))
                .ok_or_else(|| invalid_data("VALUE frame length overflows"))?;
            if src.len() < frame_len {
                src.reserve(frame_len - src.len());
                return Ok(None);
            }

            let _header = src.split_to(header_len);
            let data = src.split_to(len).freeze();
            let trailer = src.split_to(VALUE_TRAILER.len());
            if &trailer[..] != VALUE_TRAILER {
                return Err(invalid_data("VALUE data not followed by END"));
            }
            return Ok(Some(Response::Value(data)));
        }

        let line = src.split_to(line_end + CRLF.len());
        let text = std::str::from_utf8(&line[..line_end])
            .map_err(|_| invalid_data("response line is not UTF-8"))?;

        let response = match text {
            "STORED" => Response::Stored,
            "NOT_STORED" => Response::NotStored,
            "END" => Response::Miss,
            "DELETED" => Response::Deleted,
            "NOT_FOUND" => Response::NotFound,
            "ERROR" => Response::Error,
            _ => {
                if let Some(msg) = text.strip_prefix("CLIENT_ERROR ") {
                    Response::ClientError(msg.to_string())
                } else if let Some(msg) = text.strip_prefix("SERVER_ERROR ") {
                    Response::ServerError(msg.to_string())
                } else {
                    return Err(invalid_data(format!("unexpected response line {text:?}")));
                }
            }
        };

        Ok(Some(response))
    }
}

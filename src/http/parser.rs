use thiserror::Error;

use crate::http::request::{Method, Request};
use crate::http::resolver::Outcome;

const HEADERS_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed request line")]
    Malformed,
    #[error("method {0:?} not allowed")]
    DisallowedMethod(String),
}

impl ParseError {
    /// The outcome a request failing with this error is answered with.
    pub fn outcome(&self) -> Outcome {
        match self {
            ParseError::Malformed => Outcome::BadRequest,
            ParseError::DisallowedMethod(_) => Outcome::MethodNotAllowed,
        }
    }
}

/// Parses the request line out of the bytes read from a client.
///
/// The buffer may or may not contain the full header block; everything
/// after the first CRLF is ignored.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, ParseError> {
    let head = match find_headers_end(buf) {
        Some(end) => &buf[..end],
        None => buf,
    };

    let head = std::str::from_utf8(head).map_err(|_| ParseError::Malformed)?;

    // Request line
    let request_line = head.split("\r\n").next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();

    let (Some(method_str), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::Malformed);
    };

    let method = Method::parse(method_str)
        .ok_or_else(|| ParseError::DisallowedMethod(method_str.to_string()))?;

    Ok(Request {
        method,
        target: target.to_string(),
        version: version.to_string(),
    })
}

/// Position of the CRLFCRLF sequence ending the header block, if present.
pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADERS_END.len())
        .position(|w| w == HEADERS_END)
}

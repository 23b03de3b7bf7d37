use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::http::mime::{DEFAULT_CONTENT_TYPE, content_type};
use crate::http::request::Method;
use crate::http::resolver::{Outcome, ResolvedTarget};

pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Value of the `Server` header.
pub const SERVER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// HTTP status codes produced by the server.
///
/// - `Ok` (200): File found and served
/// - `BadRequest` (400): Malformed request or path outside the document root
/// - `NotFound` (404): No such file
/// - `MethodNotAllowed` (405): Method other than GET or HEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use fileserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use fileserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// A complete HTTP response ready to be sent to a client.
///
/// Headers are kept in transmission order.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Header entries, written verbatim in this order
    pub headers: Vec<(&'static str, String)>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Looks up a header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Renders the response as sent on the wire: status line, headers,
    /// blank line, body.
    pub fn encode(&self) -> Bytes {
        let mut head = format!(
            "{HTTP_VERSION} {} {}\r\n",
            self.status.as_u16(),
            self.status.reason_phrase()
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut buf = BytesMut::with_capacity(head.len() + self.body.len());
        buf.put_slice(head.as_bytes());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

/// Builder for responses carrying the fixed header set.
///
/// Every response gets, in order: `Content-Type`, `Content-Length`,
/// `Server`, `Connection: close` and `Date`.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .content_type("text/plain")
///     .body(b"hi".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    content_type: &'static str,
    content_length: Option<u64>,
    date: DateTime<Utc>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: DEFAULT_CONTENT_TYPE,
            content_length: None,
            date: Utc::now(),
            body: Vec::new(),
        }
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }

    /// Overrides the advertised length, e.g. for HEAD where no body is sent.
    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Content-Length defaults to the body size unless set explicitly.
    pub fn build(self) -> Response {
        let length = self
            .content_length
            .unwrap_or(self.body.len() as u64);

        let headers = vec![
            ("Content-Type", self.content_type.to_string()),
            ("Content-Length", length.to_string()),
            ("Server", SERVER.to_string()),
            ("Connection", "close".to_string()),
            ("Date", http_date(&self.date)),
        ];

        Response {
            status: self.status,
            headers,
            body: self.body,
        }
    }

    /// Builds the response for a resolved request.
    ///
    /// Only GET on a found file carries a body; HEAD reports the file size
    /// without one. `method` is `None` when the request line could not be
    /// parsed. A file that cannot be read any more is answered with 404.
    pub async fn for_target(method: Option<Method>, target: &ResolvedTarget) -> Response {
        let (Outcome::Ok, Some(path)) = (target.outcome, target.path.as_deref()) else {
            return ResponseBuilder::new(target.outcome.into()).build();
        };

        match file_response(method, path).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read file");
                ResponseBuilder::new(StatusCode::NotFound).build()
            }
        }
    }
}

async fn file_response(method: Option<Method>, path: &Path) -> std::io::Result<Response> {
    let size = tokio::fs::metadata(path).await?.len();

    let builder = ResponseBuilder::new(StatusCode::Ok)
        .content_type(content_type(path))
        .content_length(size);

    if method != Some(Method::GET) {
        return Ok(builder.build());
    }

    tracing::info!(path = %path.display(), "Reading file");
    let body = tokio::fs::read(path).await?;

    Ok(builder
        .content_length(body.len() as u64)
        .body(body)
        .build())
}

/// Formats a timestamp as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

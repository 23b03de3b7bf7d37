use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

/// HTTP request methods served by this server.
///
/// Anything else is rejected by the parser with 405 Method Not Allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string is an allowed method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use fileserve::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Some(Method::GET));
    /// assert_eq!(Method::parse("get"), None);
    /// assert_eq!(Method::parse("POST"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed HTTP request line.
///
/// Header fields are not retained; only the request line drives the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method
    pub method: Method,
    /// The raw request target, still URL-encoded (e.g. "/a%20b.txt?x=1")
    pub target: String,
    /// HTTP version as sent by the client (informational only)
    pub version: String,
}

impl Request {
    /// The percent-decoded path component of the request target.
    pub fn decoded_path(&self) -> String {
        decode_target(&self.target)
    }
}

/// Extracts the path component of a request target and percent-decodes it,
/// treating `+` as a space.
///
/// Both origin-form (`/index.html?x=1`) and absolute-form
/// (`http://host/index.html`) targets are accepted.
///
/// # Example
///
/// ```
/// # use fileserve::http::request::decode_target;
/// assert_eq!(decode_target("/my%20file+name.txt?v=2"), "/my file name.txt");
/// ```
pub fn decode_target(target: &str) -> String {
    let path = strip_query(origin_path(target));
    let path = path.replace('+', " ");
    percent_decode_str(&path).decode_utf8_lossy().into_owned()
}

/// The path of an absolute-form target, sliced verbatim so dot segments
/// reach the resolver. `Url` would fold them away.
fn origin_path(target: &str) -> &str {
    let is_absolute = match Url::parse(target) {
        Ok(url) => url.has_host(),
        Err(_) => false,
    };
    if !is_absolute {
        return target;
    }

    let Some(scheme_end) = target.find("://") else {
        return target;
    };
    let rest = &target[scheme_end + 3..];

    match rest.find(['/', '?', '#']) {
        Some(i) if rest[i..].starts_with('/') => &rest[i..],
        _ => "/",
    }
}

fn strip_query(target: &str) -> &str {
    target
        .split(['?', '#'])
        .next()
        .unwrap_or(target)
}

use std::path::Path;

/// Content type for error responses and files of unknown type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Guesses the content type of a file from its extension.
///
/// # Example
///
/// ```
/// # use fileserve::http::mime::content_type;
/// # use std::path::Path;
/// assert_eq!(content_type(Path::new("index.html")), "text/html");
/// assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
/// ```
pub fn content_type(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

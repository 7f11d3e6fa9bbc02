//! HTTP/1.1 request parsing using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// A parsed HTTP/1.1 request.
///
/// # Examples
///
/// ```
/// use kvprobe::http::Request;
///
/// let raw = b"GET /my-key?verbose=1 HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let (request, _offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/my-key");
/// assert_eq!(request.query_string(), Some("verbose=1"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    body: Bytes,
}

impl Request {
    const MAX_HEADERS: usize = 64;

    /// Parses the request head in `buf`.
    ///
    /// Returns the request and the offset at which its body starts. Whatever
    /// bytes follow the head are copied into the body; the server only hands
    /// a request to handlers once `Content-Length` bytes are buffered.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] when the head is not fully buffered yet.
    /// - [`RequestError::Parse`] for malformed input.
    /// - [`RequestError::MissingField`] if method, path or version is absent.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = Method::from(
            raw.method
                .ok_or(RequestError::MissingField { field: "method" })?,
        );
        let target = raw.path.ok_or(RequestError::MissingField { field: "path" })?;
        let version = raw
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (target.to_owned(), None),
        };

        let mut header_map = Headers::with_capacity(raw.headers.len());
        for header in raw.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        Ok((
            Self {
                method,
                path,
                query,
                version,
                headers: header_map,
                body: Bytes::copy_from_slice(&buf[body_offset..]),
            },
            body_offset,
        ))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path without the query string, still percent-encoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// HTTP/1.1 defaults to keep-alive, HTTP/1.0 to close, unless the
    /// `Connection` header says otherwise.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.parse().ok()
    }
}

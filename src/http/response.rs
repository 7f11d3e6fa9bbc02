//! HTTP/1.1 response builder and wire serialization.

use bytes::{BufMut, BytesMut};

use super::{Headers, StatusCode};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use kvprobe::http::{Response, StatusCode};
///
/// let response = Response::html(StatusCode::Ok, "<h4>ok</h4>");
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
}

impl Response {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
        }
    }

    /// Creates an HTML response. Every page the probe renders goes through here.
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .header("Content-Type", HTML_CONTENT_TYPE)
            .body(body)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Serializes the response in HTTP/1.1 wire format.
    ///
    /// Adds `Content-Type: text/plain` for non-empty bodies without one, then
    /// `Connection` and `Content-Length`.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        self.headers.insert("Connection", connection);

        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 64 + content_length);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {content_length}\r\n\r\n").as_bytes());
        buf.put(self.body.as_slice());

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn html_response_sets_content_type_once() {
        let s = to_string(Response::html(StatusCode::Ok, "<p>hi</p>").into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert_eq!(s.matches("Content-Type:").count(), 1);
        assert!(s.contains("Content-Length: 9\r\n"));
        assert!(s.ends_with("\r\n\r\n<p>hi</p>"));
    }

    #[test]
    fn plain_body_gets_default_content_type() {
        let s = to_string(Response::new(StatusCode::BadRequest).body("nope").into_bytes());
        assert!(s.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    }

    #[test]
    fn empty_body_has_no_content_type() {
        let s = to_string(Response::new(StatusCode::NoContent).into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn connection_close() {
        let s = to_string(Response::new(StatusCode::Ok).keep_alive(false).into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn body_text_is_readable_before_serialization() {
        let r = Response::html(StatusCode::BadGateway, "trace");
        assert_eq!(r.body_text(), "trace");
        assert_eq!(r.status(), StatusCode::BadGateway);
        assert_eq!(r.headers().get("content-type"), Some(HTML_CONTENT_TYPE));
    }
}

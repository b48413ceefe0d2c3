//! Minimal HTTP/1.1 message model for the upgrade exchange.
//!
//! Only what the handshake needs: a request or status line, an ordered
//! header list with case-insensitive lookup, and serialization. Bodies are
//! never read or written.

use std::fmt;

use crate::config::Limits;
use crate::error::{Error, Result};

/// HTTP protocol version from a request or status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpVersion {
    pub major: u8,
    pub minor: u8,
}

impl HttpVersion {
    pub const HTTP_1_0: Self = Self { major: 1, minor: 0 };
    pub const HTTP_1_1: Self = Self { major: 1, minor: 1 };

    /// Parse `HTTP/<major>[.<minor>]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] for anything else.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidHandshake(format!("Invalid HTTP version: {s}"));
        let digits = s.strip_prefix("HTTP/").ok_or_else(invalid)?;
        let (major, minor) = digits.split_once('.').unwrap_or((digits, "0"));
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self::HTTP_1_1
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Ordered header list. Names compare case-insensitively; repeated headers
/// are kept as separate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values of `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every instance of `name` joined with `", "`, or `None` if absent.
    pub fn get(&self, name: &str) -> Option<String> {
        let mut values = self.get_all(name);
        let first = values.next()?;
        Some(values.fold(first.to_string(), |mut joined, value| {
            joined.push_str(", ");
            joined.push_str(value);
            joined
        }))
    }

    /// Whether any instance of `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get_all(name).next().is_some()
    }

    /// Comma-separated list elements across every instance of `name`,
    /// trimmed, with empty elements dropped.
    pub fn tokens<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.get_all(name)
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Whether the comma-separated list in `name` holds `token`
    /// (case-insensitive).
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.tokens(name).any(|t| t.eq_ignore_ascii_case(token))
    }

    /// Add a value, keeping existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every value of `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Drop every value of `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse header lines up to the first empty line.
    fn parse<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut headers = Self::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                Error::InvalidHandshake(format!("Malformed header line: {line}"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidHandshake("Empty header name".into()));
            }
            headers.append(name, value.trim());
        }
        Ok(headers)
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        for (name, value) in self.iter() {
            validate_header_value(name, name)?;
            validate_header_value(name, value)?;
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Reject header text containing CR or LF, which would split the message.
fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Length of the HTTP head in `data` (through the blank line), once it has
/// fully arrived.
pub fn head_len(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Size of the head in `data`, or of everything buffered while the head is
/// still incomplete.
fn head_size(data: &[u8]) -> usize {
    head_len(data).unwrap_or(data.len())
}

/// The head of `data` as text. Bytes after the blank line are ignored.
fn head_text(data: &[u8]) -> Result<&str> {
    let len = head_len(data)
        .ok_or_else(|| Error::InvalidHandshake("Incomplete HTTP head".into()))?;
    std::str::from_utf8(&data[..len]).map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))
}

/// An HTTP request, as sent by a client opening a WebSocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub method: String,
    /// Request target, e.g. `/chat?room=1`.
    pub uri: String,
    pub version: HttpVersion,
    pub headers: Headers,
}

impl HandshakeRequest {
    /// An HTTP/1.1 request with no headers.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            version: HttpVersion::HTTP_1_1,
            headers: Headers::new(),
        }
    }

    /// Builder-style [`Headers::append`].
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Every instance of a header joined with `", "`.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name)
    }

    /// Parse a request head.
    ///
    /// Only HTTP syntax is checked here; WebSocket requirements are left to
    /// the server negotiator so it can answer with the right status code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] for a head without its blank line,
    /// non-UTF-8 input, a request line
    /// that is not `METHOD TARGET VERSION`, or a header line without `:`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut lines = head_text(data)?.lines();

        let request_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty request".into()))?;
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        let [method, uri, version] = parts.as_slice() else {
            return Err(Error::InvalidHandshake(format!(
                "Invalid request line: {request_line}"
            )));
        };

        Ok(Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: HttpVersion::parse(version)?,
            headers: Headers::parse(lines)?,
        })
    }

    /// Parse a request head within `limits.max_handshake_size`.
    ///
    /// # Errors
    ///
    /// `Error::HandshakeTooLarge`, or anything [`parse`](Self::parse) returns.
    pub fn parse_with_limits(data: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_handshake_size(head_size(data))?;
        Self::parse(data)
    }

    /// Serialize the request head.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHeaderValue` if a header contains CR or LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("request-target", &self.uri)?;
        buf.extend_from_slice(
            format!("{} {} {}\r\n", self.method, self.uri, self.version).as_bytes(),
        );
        self.headers.write(buf)
    }

    /// Serialize the request head into a new buffer.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);
        self.write(&mut buf)?;
        Ok(buf)
    }
}

/// An HTTP response to an upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub version: HttpVersion,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

impl HandshakeResponse {
    /// An HTTP/1.1 response with the standard reason phrase for `status`.
    pub fn new(status: u16) -> Self {
        Self {
            version: HttpVersion::HTTP_1_1,
            status,
            reason: reason_phrase(status).to_string(),
            headers: Headers::new(),
        }
    }

    /// Builder-style [`Headers::append`].
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Every instance of a header joined with `", "`.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name)
    }

    /// Whether this is a `101 Switching Protocols` response.
    pub fn is_upgrade(&self) -> bool {
        self.status == 101
    }

    /// Parse a response head.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] for an incomplete head, non-UTF-8
    /// input, a malformed status line, or a header line without `:`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut lines = head_text(data)?.lines();

        let status_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty response".into()))?;
        let mut parts = status_line.splitn(3, ' ');
        let version = HttpVersion::parse(parts.next().unwrap_or_default())?;
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| {
                Error::InvalidHandshake(format!("Invalid status line: {status_line}"))
            })?;
        let reason = parts.next().unwrap_or_default().trim().to_string();

        Ok(Self {
            version,
            status,
            reason,
            headers: Headers::parse(lines)?,
        })
    }

    /// Parse a response head within `limits.max_handshake_size`.
    ///
    /// # Errors
    ///
    /// `Error::HandshakeTooLarge`, or anything [`parse`](Self::parse) returns.
    pub fn parse_with_limits(data: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_handshake_size(head_size(data))?;
        Self::parse(data)
    }

    /// Serialize the response head.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHeaderValue` if a header contains CR or LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("reason-phrase", &self.reason)?;
        buf.extend_from_slice(
            format!("{} {} {}\r\n", self.version, self.status, self.reason).as_bytes(),
        );
        self.headers.write(buf)
    }

    /// Serialize the response head into a new buffer.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);
        self.write(&mut buf)?;
        Ok(buf)
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        101 => "Switching Protocols",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        426 => "Upgrade Required",
        500 => "Internal Server Error",
        505 => "HTTP Version Not Supported",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
        Host: server.example.com\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Origin: http://example.com\r\n\
        Sec-WebSocket-Protocol: chat\r\n\
        Sec-WebSocket-Protocol: superchat\r\n\
        Sec-WebSocket-Version: 13\r\n\
        \r\n";

    #[test]
    fn test_parse_request() {
        let req = HandshakeRequest::parse(REQUEST).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.uri, "/chat");
        assert_eq!(req.version, HttpVersion::HTTP_1_1);
        assert_eq!(req.header("host").as_deref(), Some("server.example.com"));
        assert_eq!(
            req.header("SEC-WEBSOCKET-KEY").as_deref(),
            Some("dGhlIHNhbXBsZSBub25jZQ==")
        );
        assert_eq!(
            req.header("Sec-WebSocket-Protocol").as_deref(),
            Some("chat, superchat")
        );
        assert_eq!(req.header("Cookie"), None);
    }

    #[test]
    fn test_parse_request_errors() {
        assert!(HandshakeRequest::parse(b"").is_err());
        assert!(HandshakeRequest::parse(b"GET /chat\r\n\r\n").is_err());
        assert!(HandshakeRequest::parse(b"GET / FTP/1.1\r\n\r\n").is_err());
        assert!(HandshakeRequest::parse(b"GET / HTTP/1.1\r\nNoColon\r\n\r\n").is_err());
        assert!(HandshakeRequest::parse(b"GET / HTTP/1.1\r\nHost: x\r\n").is_err());
        assert!(HandshakeRequest::parse(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_parse_with_limits() {
        let tight = Limits::default().with_handshake_size(16);
        assert!(matches!(
            HandshakeRequest::parse_with_limits(REQUEST, &tight),
            Err(Error::HandshakeTooLarge { max: 16, .. })
        ));
        assert!(HandshakeRequest::parse_with_limits(REQUEST, &Limits::unlimited()).is_ok());

        let exact = Limits::default().with_handshake_size(REQUEST.len());
        assert!(HandshakeRequest::parse_with_limits(REQUEST, &exact).is_ok());

        // Frame bytes already buffered behind the head do not count.
        let mut with_frame = REQUEST.to_vec();
        with_frame.extend_from_slice(&[0x81, 0x80, 0, 0, 0, 0]);
        assert!(HandshakeRequest::parse_with_limits(&with_frame, &exact).is_ok());
    }

    #[test]
    fn test_request_round_trip() {
        let req = HandshakeRequest::parse(REQUEST).unwrap();
        let bytes = req.to_bytes().unwrap();
        assert_eq!(HandshakeRequest::parse(&bytes).unwrap(), req);
        assert!(bytes.ends_with(b"\r\n\r\n"));
    }

    #[test]
    fn test_http_version() {
        assert_eq!(HttpVersion::parse("HTTP/1.0").unwrap(), HttpVersion::HTTP_1_0);
        assert_eq!(
            HttpVersion::parse("HTTP/2").unwrap(),
            HttpVersion { major: 2, minor: 0 }
        );
        assert!(HttpVersion::HTTP_1_0 < HttpVersion::HTTP_1_1);
        assert!(HttpVersion::parse("HTTP/x.1").is_err());
        assert_eq!(HttpVersion::HTTP_1_1.to_string(), "HTTP/1.1");
    }

    #[test]
    fn test_headers_tokens() {
        let mut headers = Headers::new();
        headers.append("Connection", "keep-alive, Upgrade");
        headers.append("connection", " , close");
        let tokens: Vec<_> = headers.tokens("CONNECTION").collect();
        assert_eq!(tokens, vec!["keep-alive", "Upgrade", "close"]);
        assert!(headers.has_token("Connection", "upgrade"));
        assert!(!headers.has_token("Connection", "websocket"));
    }

    #[test]
    fn test_headers_insert_replaces() {
        let mut headers = Headers::new();
        headers.append("X-A", "1");
        headers.append("x-a", "2");
        headers.insert("X-a", "3");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-A").as_deref(), Some("3"));
        headers.remove("X-A");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_response_parse_and_write() {
        let resp = HandshakeResponse::new(101)
            .with_header("Upgrade", "websocket")
            .with_header("Connection", "Upgrade");
        let bytes = resp.to_bytes().unwrap();
        assert!(bytes.starts_with(b"HTTP/1.1 101 Switching Protocols\r\n"));

        let parsed = HandshakeResponse::parse(&bytes).unwrap();
        assert_eq!(parsed, resp);
        assert!(parsed.is_upgrade());
    }

    #[test]
    fn test_response_without_reason() {
        let parsed = HandshakeResponse::parse(b"HTTP/1.1 426\r\n\r\n").unwrap();
        assert_eq!(parsed.status, 426);
        assert_eq!(parsed.reason, "");
        assert!(HandshakeResponse::parse(b"HTTP/1.1 abc\r\n\r\n").is_err());
    }

    #[test]
    fn test_write_rejects_crlf() {
        let resp =
            HandshakeResponse::new(101).with_header("Sec-WebSocket-Protocol", "chat\r\nX: y");
        assert!(matches!(
            resp.to_bytes(),
            Err(Error::InvalidHeaderValue { header, .. }) if header == "Sec-WebSocket-Protocol"
        ));
    }

    #[test]
    fn test_head_len() {
        assert_eq!(head_len(REQUEST), Some(REQUEST.len()));
        assert_eq!(head_len(&REQUEST[..REQUEST.len() - 1]), None);
        assert_eq!(head_len(b"HTTP/1.1 101\r\n\r\n\x81\x00"), Some(16));
    }
}

//! Individual checks behind the upgrade handshake (RFC 6455 Section 4).
//!
//! The request checks are run by the server negotiator in a fixed order so
//! the first failure picks the response status. The response check is run by
//! the client.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::http::{HandshakeRequest, HandshakeResponse, Headers, HttpVersion};
use super::{WS_VERSION, compute_accept_key};
use crate::error::{Error, Result};

/// Upgrades are only defined for `GET`.
pub fn verify_method(method: &str) -> bool {
    method == "GET"
}

/// HTTP/1.1 or later.
pub fn verify_http_version(version: HttpVersion) -> bool {
    version >= HttpVersion::HTTP_1_1
}

pub fn verify_request_uri(uri: &str) -> bool {
    !uri.is_empty()
}

pub fn verify_host(headers: &Headers) -> bool {
    headers.get_all("Host").any(|host| !host.trim().is_empty())
}

/// `Upgrade` lists `websocket`.
pub fn verify_upgrade(headers: &Headers) -> bool {
    headers.has_token("Upgrade", "websocket")
}

/// `Connection` lists `Upgrade`.
pub fn verify_connection(headers: &Headers) -> bool {
    headers.has_token("Connection", "upgrade")
}

/// `Sec-WebSocket-Key` is a single base64 value of exactly 16 bytes.
pub fn verify_key(headers: &Headers) -> bool {
    let mut keys = headers.get_all("Sec-WebSocket-Key");
    match (keys.next(), keys.next()) {
        (Some(key), None) => BASE64
            .decode(key.trim())
            .is_ok_and(|decoded| decoded.len() == 16),
        _ => false,
    }
}

/// `Sec-WebSocket-Version` is 13.
pub fn verify_version(headers: &Headers) -> bool {
    headers.get("Sec-WebSocket-Version").as_deref() == Some(WS_VERSION)
}

/// Client side: check a server's answer to `request`.
///
/// Covers the status code, `Upgrade`, `Connection` and an exact
/// `Sec-WebSocket-Accept` match. Subprotocol and extension checks need the
/// client's configuration and live in the client negotiator.
///
/// # Errors
///
/// Returns [`Error::InvalidHandshake`] naming the first failed check.
pub fn verify_response(request: &HandshakeRequest, response: &HandshakeResponse) -> Result<()> {
    if response.status != 101 {
        return Err(Error::InvalidHandshake(format!(
            "Expected status 101, got {}",
            response.status
        )));
    }
    if !verify_upgrade(&response.headers) {
        return Err(Error::InvalidHandshake(
            "Missing or invalid Upgrade header in response".into(),
        ));
    }
    if !verify_connection(&response.headers) {
        return Err(Error::InvalidHandshake(
            "Missing or invalid Connection header in response".into(),
        ));
    }

    let key = request
        .header("Sec-WebSocket-Key")
        .ok_or_else(|| Error::InvalidHandshake("Request has no Sec-WebSocket-Key".into()))?;
    let expected = compute_accept_key(&key);
    match response.header("Sec-WebSocket-Accept") {
        Some(accept) if accept == expected => Ok(()),
        Some(accept) => Err(Error::InvalidHandshake(format!(
            "Sec-WebSocket-Accept mismatch: expected {expected}, got {accept}"
        ))),
        None => Err(Error::InvalidHandshake(
            "Missing Sec-WebSocket-Accept header".into(),
        )),
    }
}

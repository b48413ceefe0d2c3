//! WebSocket opening handshake (RFC 6455 Section 4).
//!
//! [`ServerNegotiator`] turns a client's upgrade request into a response,
//! never failing: a bad request yields an error response. [`ClientNegotiator`]
//! builds the request and checks the server's answer. Both settle on a
//! [`Negotiated`] result used to construct the connection's assembler and
//! writer.

mod client;
pub mod http;
mod server;
pub mod verifier;

pub use client::ClientNegotiator;
pub use http::{HandshakeRequest, HandshakeResponse, Headers, HttpVersion};
pub use server::{ServerHandshake, ServerNegotiator};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};

use crate::error::Result;
use crate::extensions::PermessageDeflateOptions;

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this crate speaks.
pub const WS_VERSION: &str = "13";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use rfc6455::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// A fresh Sec-WebSocket-Key: 16 random bytes, base64-encoded.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if no randomness is available.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)?;
    Ok(BASE64.encode(nonce))
}

/// What both ends agreed on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Negotiated {
    /// Selected `Sec-WebSocket-Protocol`, if any.
    pub subprotocol: Option<String>,
    /// permessage-deflate parameters; disabled when not negotiated.
    pub deflate: PermessageDeflateOptions,
}

//! Server side of the opening handshake.

use super::http::{HandshakeRequest, HandshakeResponse};
use super::verifier::{
    verify_connection, verify_host, verify_http_version, verify_key, verify_method,
    verify_request_uri, verify_upgrade, verify_version,
};
use super::{Negotiated, WS_VERSION, compute_accept_key};
use crate::extensions::{DeflateConfig, PermessageDeflateOptions};

/// Result of [`ServerNegotiator::handshake`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandshake {
    /// Response to send, `101` or an error status.
    pub response: HandshakeResponse,
    /// Present only when the upgrade was accepted.
    pub negotiated: Option<Negotiated>,
}

impl ServerHandshake {
    /// Whether the connection switches to WebSocket.
    pub fn is_accepted(&self) -> bool {
        self.negotiated.is_some()
    }

    fn reject(response: HandshakeResponse, why: &str) -> Self {
        log::debug!("rejecting upgrade with {}: {why}", response.status);
        Self {
            response,
            negotiated: None,
        }
    }
}

/// Validates upgrade requests and negotiates subprotocol and compression.
///
/// ```
/// use rfc6455::handshake::{HandshakeRequest, ServerNegotiator};
///
/// let negotiator = ServerNegotiator::new().with_supported_subprotocols(["chat"]);
/// let request = HandshakeRequest::new("GET", "/")
///     .with_header("Host", "example.com")
///     .with_header("Upgrade", "websocket")
///     .with_header("Connection", "Upgrade")
///     .with_header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
///     .with_header("Sec-WebSocket-Version", "13")
///     .with_header("Sec-WebSocket-Protocol", "superchat, chat");
///
/// let outcome = negotiator.handshake(&request);
/// assert_eq!(outcome.response.status, 101);
/// assert_eq!(outcome.response.header("Sec-WebSocket-Protocol").as_deref(), Some("chat"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServerNegotiator {
    supported_subprotocols: Vec<String>,
    strict_subprotocols: bool,
    deflate: Option<DeflateConfig>,
}

impl ServerNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subprotocols this server speaks.
    #[must_use]
    pub fn with_supported_subprotocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_subprotocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Refuse the upgrade (426) when the client requests subprotocols but
    /// none of them is supported.
    #[must_use]
    pub fn with_strict_subprotocols(mut self, strict: bool) -> Self {
        self.strict_subprotocols = strict;
        self
    }

    /// Accept permessage-deflate offers, tightened by `config`.
    #[must_use]
    pub fn with_permessage_deflate(mut self, config: DeflateConfig) -> Self {
        self.deflate = Some(config);
        self
    }

    /// Whether the request asks for the protocol version this server speaks.
    pub fn is_protocol(&self, request: &HandshakeRequest) -> bool {
        verify_version(&request.headers)
    }

    /// Answer an upgrade request.
    ///
    /// Checks run in order and the first failure decides the status:
    /// method (405), HTTP version (505), request target, `Host`, `Upgrade`,
    /// `Connection` and `Sec-WebSocket-Key` (400), then the WebSocket version
    /// (426). Subprotocol and extension negotiation follow.
    pub fn handshake(&self, request: &HandshakeRequest) -> ServerHandshake {
        if !verify_method(&request.method) {
            return ServerHandshake::reject(
                HandshakeResponse::new(405).with_header("Allow", "GET"),
                "method is not GET",
            );
        }
        if !verify_http_version(request.version) {
            return ServerHandshake::reject(HandshakeResponse::new(505), "HTTP version below 1.1");
        }
        if !verify_request_uri(&request.uri) {
            return ServerHandshake::reject(HandshakeResponse::new(400), "empty request target");
        }
        if !verify_host(&request.headers) {
            return ServerHandshake::reject(HandshakeResponse::new(400), "missing Host header");
        }
        if !verify_upgrade(&request.headers) {
            return ServerHandshake::reject(
                HandshakeResponse::new(400),
                "Upgrade header must name websocket",
            );
        }
        if !verify_connection(&request.headers) {
            return ServerHandshake::reject(
                HandshakeResponse::new(400),
                "Connection header must contain Upgrade",
            );
        }
        if !verify_key(&request.headers) {
            return ServerHandshake::reject(
                HandshakeResponse::new(400),
                "invalid Sec-WebSocket-Key",
            );
        }
        if !verify_version(&request.headers) {
            return ServerHandshake::reject(
                HandshakeResponse::new(426).with_header("Sec-WebSocket-Version", WS_VERSION),
                "unsupported Sec-WebSocket-Version",
            );
        }

        let mut response = HandshakeResponse::new(101);

        let subprotocol = self.select_subprotocol(request);
        if subprotocol.is_none() && self.strict_subprotocols && self.subprotocols_required(request)
        {
            return ServerHandshake::reject(
                HandshakeResponse::new(426),
                "no requested subprotocol is supported",
            );
        }
        if let Some(protocol) = &subprotocol {
            response.headers.append("Sec-WebSocket-Protocol", protocol.as_str());
        }

        let offers = match PermessageDeflateOptions::from_header_values(
            request.headers.get_all("Sec-WebSocket-Extensions"),
        ) {
            Ok(offers) => offers,
            Err(err) => {
                return ServerHandshake::reject(HandshakeResponse::new(400), &err.to_string());
            }
        };
        // The list always ends with a disabled entry, so the first is the
        // client's preferred choice.
        let deflate = match (&self.deflate, offers.first()) {
            (Some(config), Some(offer)) => config.accept(offer),
            _ => PermessageDeflateOptions::disabled(),
        };
        if let Some(value) = deflate.to_header_value() {
            response.headers.append("Sec-WebSocket-Extensions", value);
        }

        let key = request.header("Sec-WebSocket-Key").unwrap_or_default();
        response.headers.append("Upgrade", "websocket");
        response.headers.append("Connection", "Upgrade");
        response
            .headers
            .append("Sec-WebSocket-Accept", compute_accept_key(key.trim()));

        ServerHandshake {
            response,
            negotiated: Some(Negotiated {
                subprotocol,
                deflate,
            }),
        }
    }

    /// First subprotocol in the client's order that this server supports.
    fn select_subprotocol(&self, request: &HandshakeRequest) -> Option<String> {
        request
            .headers
            .tokens("Sec-WebSocket-Protocol")
            .find(|requested| self.supported_subprotocols.iter().any(|s| s == requested))
            .map(str::to_string)
    }

    /// Whether strict mode has anything to enforce for this request.
    fn subprotocols_required(&self, request: &HandshakeRequest) -> bool {
        request.headers.contains("Sec-WebSocket-Protocol")
            || !self.supported_subprotocols.is_empty()
    }
}

//! Client side of the opening handshake.

use super::http::{HandshakeRequest, HandshakeResponse};
use super::verifier::verify_response;
use super::{Negotiated, WS_VERSION, generate_key};
use crate::error::{Error, Result};
use crate::extensions::{DeflateConfig, ExtensionOffer, PERMESSAGE_DEFLATE, PermessageDeflateOptions};

const USER_AGENT: &str = concat!("rfc6455/", env!("CARGO_PKG_VERSION"));

/// Builds an upgrade request and validates the server's response.
#[derive(Debug, Clone)]
pub struct ClientNegotiator {
    host: String,
    uri: String,
    key: String,
    subprotocols: Vec<String>,
    deflate: Option<DeflateConfig>,
}

impl ClientNegotiator {
    /// Negotiator for `uri` on `host` with a fresh random key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if no randomness is available.
    pub fn new(host: impl Into<String>, uri: impl Into<String>) -> Result<Self> {
        Ok(Self {
            host: host.into(),
            uri: uri.into(),
            key: generate_key()?,
            subprotocols: Vec::new(),
            deflate: None,
        })
    }

    /// Use a fixed `Sec-WebSocket-Key` instead of the random one.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Subprotocols to request, most preferred first.
    #[must_use]
    pub fn with_subprotocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subprotocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Offer permessage-deflate with the parameters in `config`.
    #[must_use]
    pub fn with_permessage_deflate(mut self, config: DeflateConfig) -> Self {
        self.deflate = Some(config);
        self
    }

    /// The `Sec-WebSocket-Key` sent with the request.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The upgrade request to send.
    pub fn request(&self) -> HandshakeRequest {
        let mut request = HandshakeRequest::new("GET", self.uri.as_str())
            .with_header("Host", self.host.as_str())
            .with_header("Upgrade", "websocket")
            .with_header("Connection", "Upgrade")
            .with_header("Sec-WebSocket-Key", self.key.as_str())
            .with_header("Sec-WebSocket-Version", WS_VERSION)
            .with_header("Cache-Control", "no-cache")
            .with_header("Pragma", "no-cache")
            .with_header("User-Agent", USER_AGENT);
        if !self.subprotocols.is_empty() {
            request
                .headers
                .append("Sec-WebSocket-Protocol", self.subprotocols.join(", "));
        }
        if let Some(offer) = self.deflate.as_ref().and_then(|d| d.offer().to_offer_value()) {
            request.headers.append("Sec-WebSocket-Extensions", offer);
        }
        request
    }

    /// Validate the server's response and return what was agreed.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidHandshake` for a failed structural check, a wrong
    ///   `Sec-WebSocket-Accept`, or a subprotocol that was not requested
    /// - `Error::InvalidExtension` for an extension that was not offered or
    ///   whose parameters do not parse
    pub fn validate_response(&self, response: &HandshakeResponse) -> Result<Negotiated> {
        if let Err(err) = verify_response(&self.request(), response) {
            log::debug!("server handshake rejected: {err}");
            return Err(err);
        }
        Ok(Negotiated {
            subprotocol: self.accepted_subprotocol(response)?,
            deflate: self.accepted_deflate(response)?,
        })
    }

    fn accepted_subprotocol(&self, response: &HandshakeResponse) -> Result<Option<String>> {
        let Some(protocol) = response.header("Sec-WebSocket-Protocol") else {
            return Ok(None);
        };
        if self.subprotocols.iter().any(|p| *p == protocol) {
            Ok(Some(protocol))
        } else {
            Err(Error::InvalidHandshake(format!(
                "Server selected subprotocol {protocol} which was not requested"
            )))
        }
    }

    fn accepted_deflate(&self, response: &HandshakeResponse) -> Result<PermessageDeflateOptions> {
        let mut accepted = None;
        for value in response.headers.get_all("Sec-WebSocket-Extensions") {
            for offer in ExtensionOffer::parse_header(value)? {
                if !offer.is(PERMESSAGE_DEFLATE) || self.deflate.is_none() || accepted.is_some() {
                    return Err(Error::InvalidExtension(format!(
                        "Server accepted extension {offer} which was not offered"
                    )));
                }
                accepted = Some(PermessageDeflateOptions::from_offer(&offer)?);
            }
        }

        let (Some(mut options), Some(config)) = (accepted, self.deflate.as_ref()) else {
            return Ok(PermessageDeflateOptions::disabled());
        };
        options.validate_response_to_request(&[config.offer()])?;
        // A client that asked to drop its own context does so regardless.
        options.client_no_context_takeover |= config.client_no_context_takeover;
        Ok(options)
    }
}

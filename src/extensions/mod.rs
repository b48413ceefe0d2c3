//! `Sec-WebSocket-Extensions` header grammar (RFC 6455 Section 9.1) and the
//! permessage-deflate extension built on it.
//!
//! A header value is a comma-separated list of extension offers; each offer
//! is an extension token followed by `;`-separated `key[=value]` parameters.
//! Whitespace around tokens is ignored and values may be quoted.

pub mod deflate;

pub use deflate::{DeflateConfig, Deflater, Inflater, PERMESSAGE_DEFLATE, PermessageDeflateOptions};

use crate::error::{Error, Result};
use std::fmt;

/// Represents a single extension parameter.
///
/// For example `client_max_window_bits=10` or `server_no_context_takeover`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionParam {
    /// Parameter name (e.g., "client_max_window_bits").
    pub name: String,
    /// Optional parameter value. None for flag parameters.
    pub value: Option<String>,
}

impl ExtensionParam {
    /// Create a new parameter with a value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Create a flag parameter (no value).
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Parse a single parameter from a string (e.g., "param=value" or "param").
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.split_once('=') {
            Some((name, value)) => Self::new(name.trim(), value.trim().trim_matches('"').trim()),
            None => Self::flag(s),
        }
    }
}

impl fmt::Display for ExtensionParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

/// One extension entry of a `Sec-WebSocket-Extensions` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionOffer {
    /// Extension name (e.g., "permessage-deflate").
    pub name: String,
    /// Extension parameters in header order.
    pub params: Vec<ExtensionParam>,
}

impl ExtensionOffer {
    /// Parse a single extension offer from a string.
    ///
    /// Format: `extension-name; param1=value1; param2`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtension`] if the extension name is empty.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(Error::InvalidExtension("empty extension name".into()));
        }

        Ok(Self {
            name: name.to_string(),
            params: parts.map(ExtensionParam::parse).collect(),
        })
    }

    /// Parse every offer in a header value, skipping empty list elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtension`] if any extension offer in the header is invalid.
    pub fn parse_header(header: &str) -> Result<Vec<Self>> {
        header
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Whether this offer names the given extension (case-insensitive).
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for ExtensionOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for param in &self.params {
            write!(f, "; {param}")?;
        }
        Ok(())
    }
}

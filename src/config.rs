//! Configuration and limits for WebSocket endpoints.

use crate::connection::Role;
use crate::error::{Error, Result};
use crate::extensions::deflate::DeflateConfig;

/// Largest limit accepted by [`Limits::new`]; RFC 6455 payload lengths are
/// 63-bit values.
pub const MAX_LIMIT: u64 = i64::MAX as u64;

/// Size limits for inbound data.
///
/// A limit of `0` means unlimited. Frame and message limits are checked
/// against the length a frame *declares*, before its payload is buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single frame in bytes.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of a complete message in bytes, summed over all of its
    /// fragments and, for compressed messages, applied again after inflation.
    ///
    /// Default: 64 MB (64 * 1024 * 1024)
    pub max_message_size: usize,

    /// Maximum size of an HTTP upgrade request or response in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,   // 16 MB
            max_message_size: 64 * 1024 * 1024, // 64 MB
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create limits for frame and message sizes (`0` = unlimited).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either value exceeds `i64::MAX` or
    /// cannot be represented on this platform.
    pub fn new(max_frame_size: u64, max_message_size: u64) -> Result<Self> {
        Ok(Self {
            max_frame_size: checked_limit("max_frame_size", max_frame_size)?,
            max_message_size: checked_limit("max_message_size", max_message_size)?,
            ..Self::default()
        })
    }

    /// Limits with every check disabled.
    ///
    /// Warning: Use only in trusted environments.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_frame_size: 0,
            max_message_size: 0,
            max_handshake_size: 0,
        }
    }

    /// Set the handshake size limit (`0` = unlimited).
    #[must_use]
    pub const fn with_handshake_size(mut self, size: usize) -> Self {
        self.max_handshake_size = size;
        self
    }

    /// Validate that a declared frame length is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds a non-zero maximum.
    pub const fn check_frame_size(&self, size: usize) -> Result<()> {
        if exceeds(size, self.max_frame_size) {
            Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a cumulative message length is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds a non-zero maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<()> {
        if exceeds(size, self.max_message_size) {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that handshake data is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`] if `size` exceeds a non-zero maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<()> {
        if exceeds(size, self.max_handshake_size) {
            Err(Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

const fn exceeds(size: usize, max: usize) -> bool {
    max != 0 && size > max
}

fn checked_limit(name: &str, value: u64) -> Result<usize> {
    if value > MAX_LIMIT {
        return Err(Error::InvalidConfig(format!(
            "{name} {value} exceeds the 63-bit payload length range"
        )));
    }
    usize::try_from(value).map_err(|_| {
        Error::InvalidConfig(format!("{name} {value} does not fit this platform"))
    })
}

/// WebSocket endpoint configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which side of the connection this endpoint plays.
    pub role: Role,

    /// Inbound resource limits.
    pub limits: Limits,

    /// Fragment size for outgoing messages (in bytes, `0` = never fragment).
    ///
    /// Default: 16 KB (16 * 1024)
    pub fragment_size: usize,

    /// permessage-deflate settings; `None` disables compression.
    ///
    /// Default: None
    pub deflate: Option<DeflateConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: Role::Server,
            limits: Limits::default(),
            fragment_size: 16 * 1024,
            deflate: None,
        }
    }
}

impl Config {
    /// Configure for server role (expects masked frames, sends unmasked).
    #[must_use]
    pub fn server() -> Self {
        Self::default()
    }

    /// Configure for client role (masks every outgoing frame).
    #[must_use]
    pub fn client() -> Self {
        Self {
            role: Role::Client,
            ..Self::default()
        }
    }

    /// Set custom limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set fragment size for outgoing messages.
    #[must_use]
    pub const fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size;
        self
    }

    /// Enable permessage-deflate with the given settings.
    #[must_use]
    pub fn with_deflate(mut self, deflate: DeflateConfig) -> Self {
        self.deflate = Some(deflate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(limits.max_message_size, 64 * 1024 * 1024);
        assert_eq!(limits.max_handshake_size, 8192);
    }

    #[test]
    fn test_limits_new() {
        let limits = Limits::new(10, 100).unwrap();
        assert_eq!(limits.max_frame_size, 10);
        assert_eq!(limits.max_message_size, 100);
        assert_eq!(limits.max_handshake_size, 8192);
    }

    #[test]
    fn test_limits_new_rejects_out_of_range() {
        let err = Limits::new(u64::MAX, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = Limits::new(0, MAX_LIMIT + 1).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_limits_zero_is_unlimited() {
        let limits = Limits::new(0, 0).unwrap();
        assert!(limits.check_frame_size(usize::MAX).is_ok());
        assert!(limits.check_message_size(usize::MAX).is_ok());
    }

    #[test]
    fn test_limits_check_frame_size() {
        let limits = Limits::default();
        assert!(limits.check_frame_size(1024).is_ok());
        assert!(matches!(
            limits.check_frame_size(20 * 1024 * 1024),
            Err(Error::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_limits_check_message_size() {
        let limits = Limits::default();
        assert!(limits.check_message_size(1024).is_ok());
        assert!(matches!(
            limits.check_message_size(100 * 1024 * 1024),
            Err(Error::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_limits_check_handshake_size() {
        let limits = Limits::default();
        assert!(limits.check_handshake_size(1024).is_ok());
        assert!(limits.check_handshake_size(10000).is_err());
        assert!(Limits::unlimited().check_handshake_size(1 << 20).is_ok());
    }

    #[test]
    fn test_config_roles() {
        assert_eq!(Config::server().role, Role::Server);
        assert_eq!(Config::client().role, Role::Client);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::client()
            .with_limits(Limits::new(64 * 1024, 256 * 1024).unwrap())
            .with_fragment_size(4096)
            .with_deflate(DeflateConfig::default());

        assert_eq!(config.fragment_size, 4096);
        assert_eq!(config.limits.max_frame_size, 64 * 1024);
        assert!(config.deflate.is_some());
    }

    #[test]
    fn test_config_deflate_off_by_default() {
        assert!(Config::default().deflate.is_none());
    }
}

//! Which end of a WebSocket connection an endpoint plays.

/// WebSocket connection role.
///
/// Fixes masking direction for the lifetime of a connection (RFC 6455
/// Section 5.1) and decides which half of a negotiated permessage-deflate
/// parameter set applies to outgoing and incoming messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Client role: masks every outgoing frame, rejects masked incoming ones.
    Client,
    /// Server role: sends unmasked frames, rejects unmasked incoming ones.
    Server,
}

impl Role {
    /// Check if this role must mask outgoing frames.
    #[inline]
    #[must_use]
    pub const fn must_mask(&self) -> bool {
        matches!(self, Role::Client)
    }

    /// Check if this role expects incoming frames to be masked.
    #[inline]
    #[must_use]
    pub const fn expects_masked(&self) -> bool {
        matches!(self, Role::Server)
    }

    /// The role at the other end of the connection.
    #[must_use]
    pub const fn peer(&self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }

    /// Lowercase name, as used in `client_*` / `server_*` extension parameters.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

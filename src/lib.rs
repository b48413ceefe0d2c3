//! # rfc6455 - WebSocket wire protocol and permessage-deflate
//!
//! A sans-I/O implementation of RFC 6455 with the RFC 7692 compression
//! extension. Bytes come in through [`MessageAssembler::feed`] and leave
//! through a [`ByteSink`]; the socket, event loop and TLS stay with the caller.
//!
//! ## Features
//!
//! - **Incremental frame parsing** tolerant of any chunk boundary
//! - **Strict validation** of masking, RSV bits, fragmentation, close codes
//!   and UTF-8, with declared-length size limits
//! - **permessage-deflate** with per-direction context takeover control
//! - **Handshake negotiation** for both server and client roles
//!
//! ## Quick Start
//!
//! ```
//! use rfc6455::{Config, Message, MessageAssembler, MessageWriter, handler_fn};
//!
//! let mut client = MessageWriter::new(&Config::client());
//! let mut wire = Vec::new();
//! client.send_text(&mut wire, "Hello").unwrap();
//!
//! let mut server = MessageAssembler::new(&Config::server());
//! let mut received = Vec::new();
//! server.feed(&wire, &mut handler_fn(|m| received.push(m), |_| {}));
//! assert_eq!(received, vec![Message::text("Hello")]);
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod extensions;
pub mod handshake;
pub mod message;
pub mod protocol;

pub use config::{Config, Limits};
pub use connection::{ByteSink, MessageWriter, Role};
pub use error::{Error, Result};
pub use extensions::{DeflateConfig, PermessageDeflateOptions};
pub use handshake::{
    ClientNegotiator, HandshakeRequest, HandshakeResponse, Negotiated, ServerNegotiator, WS_GUID,
    compute_accept_key,
};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{Frame, FrameHandler, MessageAssembler, OpCode, handler_fn};

//! The two halves of a connection that sit outside the protocol core.
//!
//! [`Role`] fixes masking direction for the connection's lifetime, and
//! [`MessageWriter`] turns outgoing messages into frames for a [`ByteSink`].
//! Inbound traffic goes through [`MessageAssembler`](crate::MessageAssembler).

mod fragmenter;
mod role;
pub mod writer;

pub use fragmenter::MessageFragmenter;
pub use role::Role;
pub use writer::{ByteSink, IoSink, MessageWriter};

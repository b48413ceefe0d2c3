//! Splitting of outgoing data messages into frames (RFC 6455 Section 5.4).

use crate::protocol::{Frame, OpCode};

/// Iterator over the frames of one outgoing data message.
///
/// The first frame carries the message opcode and, for a compressed message,
/// RSV1. Every later frame is a Continuation frame with RSV1 clear. An empty
/// payload still yields a single final frame.
#[derive(Debug)]
pub struct MessageFragmenter<'a> {
    rest: &'a [u8],
    opcode: OpCode,
    max_fragment: usize,
    compressed: bool,
    started: bool,
}

impl<'a> MessageFragmenter<'a> {
    /// Fragment `payload` into frames of at most `max_fragment` bytes
    /// (`0` = a single frame).
    #[inline]
    #[must_use]
    pub fn new(payload: &'a [u8], opcode: OpCode, max_fragment: usize) -> Self {
        Self {
            rest: payload,
            opcode,
            max_fragment: if max_fragment == 0 {
                usize::MAX
            } else {
                max_fragment
            },
            compressed: false,
            started: false,
        }
    }

    /// Mark the payload as permessage-deflate output.
    #[must_use]
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Whether the payload spans more than one frame.
    #[inline]
    #[must_use]
    pub fn needs_fragmentation(&self) -> bool {
        self.rest.len() > self.max_fragment
    }

    /// Payload bytes not yet handed out.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

impl Iterator for MessageFragmenter<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.started && self.rest.is_empty() {
            return None;
        }

        let (chunk, rest) = self.rest.split_at(self.rest.len().min(self.max_fragment));
        self.rest = rest;

        let frame = if self.started {
            Frame::new(rest.is_empty(), OpCode::Continuation, chunk)
        } else {
            self.started = true;
            Frame::new(rest.is_empty(), self.opcode, chunk).with_rsv1(self.compressed)
        };
        Some(frame)
    }
}

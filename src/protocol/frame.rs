//! WebSocket frame parsing and serialization (RFC 6455 Section 5.2).
//!
//! A [`Frame`] is filled incrementally: bytes can arrive in any chunking and
//! the frame keeps whatever part of its header or payload it has seen so far.
//! Bytes past the frame boundary are kept aside as overflow for the next
//! frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::message::CloseCode;
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask_fast;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Longest possible header: 2 fixed bytes, 8 length bytes, 4 mask bytes.
pub const MAX_HEADER_LEN: usize = 14;

/// How far a frame has been received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Fewer bytes than the header needs have arrived.
    HeaderPending,
    /// Header decoded; payload still short of its declared length.
    PayloadPending,
    /// Header and the full declared payload are present.
    Complete,
}

/// A WebSocket frame as defined in RFC 6455.
///
/// ## Frame Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode |M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)   |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
///
/// The public header fields hold placeholder values until the header has
/// been decoded (`state() != FrameState::HeaderPending`).
#[derive(Debug, Clone)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bit 1. Marks a compressed message under permessage-deflate.
    pub rsv1: bool,
    /// Reserved bit 2. Always rejected on receipt.
    pub rsv2: bool,
    /// Reserved bit 3. Always rejected on receipt.
    pub rsv3: bool,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    mask: Option<[u8; 4]>,
    payload: Vec<u8>,
    /// Whether `payload` currently holds masked bytes.
    payload_masked: bool,
    payload_len: usize,
    head: [u8; MAX_HEADER_LEN],
    head_len: usize,
    state: FrameState,
    overflow: Bytes,
}

impl Default for Frame {
    fn default() -> Self {
        Self::empty()
    }
}

impl Frame {
    /// Create a frame awaiting its first header byte.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            fin: false,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode: OpCode::Continuation,
            mask: None,
            payload: Vec::new(),
            payload_masked: false,
            payload_len: 0,
            head: [0; MAX_HEADER_LEN],
            head_len: 0,
            state: FrameState::HeaderPending,
            overflow: Bytes::new(),
        }
    }

    /// Create a complete, unmasked frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        Self {
            fin,
            opcode,
            payload_len: payload.len(),
            payload,
            state: FrameState::Complete,
            ..Self::empty()
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data)
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data)
    }

    /// Create a close frame carrying a status code and reason.
    #[must_use]
    pub fn close(code: CloseCode, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.as_u16().to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data)
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data)
    }

    /// Set the RSV1 bit.
    #[must_use]
    pub fn with_rsv1(mut self, rsv1: bool) -> Self {
        self.rsv1 = rsv1;
        self
    }

    /// Current parse state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// True once the header and the whole declared payload are present.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == FrameState::Complete
    }

    /// Payload length announced by the header.
    #[inline]
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Whether the frame carries a masking key.
    #[inline]
    #[must_use]
    pub const fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// The masking key, if any.
    #[must_use]
    pub const fn mask_key(&self) -> Option<[u8; 4]> {
        self.mask
    }

    /// Get the payload bytes received so far, masked or not as currently held.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Status code of a close frame, if its payload carries one.
    #[must_use]
    pub fn close_code(&self) -> Option<CloseCode> {
        match (self.opcode, self.payload.as_slice()) {
            (OpCode::Close, [hi, lo, ..]) => {
                Some(CloseCode::from_u16(u16::from_be_bytes([*hi, *lo])))
            }
            _ => None,
        }
    }

    /// Reason text of a close frame, if present and valid UTF-8.
    #[must_use]
    pub fn close_reason(&self) -> Option<&str> {
        match (self.opcode, self.payload.as_slice()) {
            (OpCode::Close, [_, _, reason @ ..]) => std::str::from_utf8(reason).ok(),
            _ => None,
        }
    }

    /// Attach a masking key to an outgoing frame.
    ///
    /// A payload masked under a previous key is unmasked first, so the
    /// payload is held in the clear afterwards.
    pub fn set_mask(&mut self, key: [u8; 4]) {
        self.unmask_payload();
        self.mask = Some(key);
    }

    /// XOR the payload with the frame's key unless it is already masked.
    pub fn mask_payload(&mut self) {
        if let (Some(key), false) = (self.mask, self.payload_masked) {
            apply_mask_fast(&mut self.payload, key);
            self.payload_masked = true;
        }
    }

    /// XOR the payload with the frame's key if it is currently masked.
    pub fn unmask_payload(&mut self) {
        if let (Some(key), true) = (self.mask, self.payload_masked) {
            apply_mask_fast(&mut self.payload, key);
            self.payload_masked = false;
        }
    }

    /// Minimum number of further bytes before the frame can make progress.
    #[must_use]
    pub fn bytes_needed(&self) -> usize {
        match self.state {
            FrameState::HeaderPending => self.header_len_needed() - self.head_len,
            FrameState::PayloadPending => self.payload_len - self.payload.len(),
            FrameState::Complete => 0,
        }
    }

    /// Feed bytes into the frame.
    ///
    /// Consumes as much header and payload as `data` holds. Anything past the
    /// frame boundary is kept and returned by [`extract_overflow`].
    ///
    /// # Errors
    ///
    /// - `Error::ReservedOpcode` if the header names a reserved opcode
    /// - `Error::InvalidPayloadLength` if a 64-bit length has its top bit set
    ///   or does not fit in `usize`
    ///
    /// [`extract_overflow`]: Frame::extract_overflow
    pub fn append_bytes<B: Buf>(&mut self, mut data: B) -> Result<()> {
        if self.append_header(&mut data)? {
            self.append_payload(&mut data);
        }
        if data.has_remaining() {
            let rest = data.copy_to_bytes(data.remaining());
            self.overflow = if self.overflow.is_empty() {
                rest
            } else {
                let mut joined = BytesMut::with_capacity(self.overflow.len() + rest.len());
                joined.put(std::mem::take(&mut self.overflow));
                joined.put(rest);
                joined.freeze()
            };
        }
        Ok(())
    }

    /// Take the bytes that arrived after this frame's last payload byte.
    #[must_use]
    pub fn extract_overflow(&mut self) -> Bytes {
        std::mem::take(&mut self.overflow)
    }

    /// Consume header bytes from `data`, leaving payload bytes untouched.
    ///
    /// Returns `true` once the header is decoded. Callers can vet the header,
    /// in particular the declared length, before any payload is buffered.
    ///
    /// # Errors
    ///
    /// Same as [`Frame::append_bytes`].
    pub fn append_header<B: Buf>(&mut self, data: &mut B) -> Result<bool> {
        if self.state != FrameState::HeaderPending {
            return Ok(true);
        }
        loop {
            let needed = self.header_len_needed();
            if self.head_len == needed {
                self.decode_header()?;
                return Ok(true);
            }
            let take = (needed - self.head_len).min(data.remaining());
            if take == 0 {
                return Ok(false);
            }
            data.copy_to_slice(&mut self.head[self.head_len..self.head_len + take]);
            self.head_len += take;
        }
    }

    /// Consume payload bytes from `data`, up to the declared length.
    pub fn append_payload<B: Buf>(&mut self, data: &mut B) {
        if self.state != FrameState::PayloadPending {
            return;
        }
        let take = (self.payload_len - self.payload.len()).min(data.remaining());
        self.payload.put((&mut *data).take(take));
        if self.payload.len() == self.payload_len {
            self.state = FrameState::Complete;
        }
    }

    fn header_len_needed(&self) -> usize {
        if self.head_len < 2 {
            return 2;
        }
        let extended = match self.head[1] & 0x7F {
            126 => 2,
            127 => 8,
            _ => 0,
        };
        let mask = if self.head[1] & 0x80 != 0 { 4 } else { 0 };
        2 + extended + mask
    }

    fn decode_header(&mut self) -> Result<()> {
        let byte0 = self.head[0];
        let byte1 = self.head[1];

        let opcode = OpCode::from_u8(byte0 & 0x0F)?;

        let (payload_len, mask_offset) = match byte1 & 0x7F {
            126 => (u64::from(u16::from_be_bytes([self.head[2], self.head[3]])), 4),
            127 => {
                let mut len = [0u8; 8];
                len.copy_from_slice(&self.head[2..10]);
                (u64::from_be_bytes(len), 10)
            }
            len => (u64::from(len), 2),
        };
        if payload_len > i64::MAX as u64 {
            return Err(Error::InvalidPayloadLength(payload_len));
        }
        let payload_len =
            usize::try_from(payload_len).map_err(|_| Error::InvalidPayloadLength(payload_len))?;

        self.fin = byte0 & 0x80 != 0;
        self.rsv1 = byte0 & 0x40 != 0;
        self.rsv2 = byte0 & 0x20 != 0;
        self.rsv3 = byte0 & 0x10 != 0;
        self.opcode = opcode;
        self.mask = if byte1 & 0x80 != 0 {
            let mut key = [0u8; 4];
            key.copy_from_slice(&self.head[mask_offset..mask_offset + 4]);
            Some(key)
        } else {
            None
        };
        self.payload_masked = self.mask.is_some();
        self.payload_len = payload_len;
        self.state = if payload_len == 0 {
            FrameState::Complete
        } else {
            FrameState::PayloadPending
        };
        Ok(())
    }

    /// Parse one frame from the front of `buf`.
    ///
    /// Returns the frame with its payload unmasked and the number of bytes
    /// consumed.
    ///
    /// ## Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::ReservedOpcode` if a reserved opcode is used
    /// - `Error::InvalidPayloadLength` for an unrepresentable 64-bit length
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let mut cursor = buf;
        let mut frame = Frame::empty();
        if frame.append_header(&mut cursor)? {
            frame.append_payload(&mut cursor);
        }
        if !frame.is_complete() {
            return Err(Error::IncompleteFrame {
                needed: frame.bytes_needed(),
            });
        }
        frame.unmask_payload();
        Ok((frame, buf.len() - cursor.len()))
    }

    fn header_size(&self) -> usize {
        let extended = match self.payload.len() {
            0..=125 => 0,
            126..=65535 => 2,
            _ => 8,
        };
        2 + extended + if self.mask.is_some() { 4 } else { 0 }
    }

    /// Number of bytes [`Frame::encode_into`] will write.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        self.header_size() + self.payload.len()
    }

    /// Serialize the frame with a minimal-length header.
    ///
    /// With a masking key set, the payload goes out masked whether or not it
    /// is currently held masked.
    pub fn encode_into(&self, out: &mut BytesMut) {
        let payload_len = self.payload.len();
        out.reserve(self.wire_size());

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= 0x80;
        }
        if self.rsv1 {
            byte0 |= 0x40;
        }
        if self.rsv2 {
            byte0 |= 0x20;
        }
        if self.rsv3 {
            byte0 |= 0x10;
        }
        out.put_u8(byte0);

        let mask_bit = if self.mask.is_some() { 0x80 } else { 0 };
        match payload_len {
            0..=125 => out.put_u8(mask_bit | payload_len as u8),
            126..=65535 => {
                out.put_u8(mask_bit | 126);
                out.put_u16(payload_len as u16);
            }
            _ => {
                out.put_u8(mask_bit | 127);
                out.put_u64(payload_len as u64);
            }
        }

        let start = out.len() + if self.mask.is_some() { 4 } else { 0 };
        if let Some(key) = self.mask {
            out.put_slice(&key);
        }
        out.put_slice(&self.payload);
        if let (Some(key), false) = (self.mask, self.payload_masked) {
            apply_mask_fast(&mut out[start..], key);
        }
    }

    /// Serialize the frame into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.wire_size());
        self.encode_into(&mut out);
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --------------------------------------------------------------------------
    // Test 1: Unmasked text frame
    // --------------------------------------------------------------------------
    #[test]
    fn test_parse_unmasked_text_frame() {
        // FIN=1, opcode=1 (text), unmasked, payload="Hello"
        let data = &[0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f];
        let (frame, len) = Frame::parse(data).unwrap();
        assert_eq!(len, 7);
        assert!(frame.fin);
        assert!(!frame.rsv1 && !frame.rsv2 && !frame.rsv3);
        assert_eq!(frame.opcode, OpCode::Text);
        assert!(!frame.is_masked());
        assert_eq!(frame.payload(), b"Hello");
    }

    // --------------------------------------------------------------------------
    // Test 2: Masked text frame (RFC 6455 Section 5.7)
    // --------------------------------------------------------------------------
    #[test]
    fn test_parse_masked_text_frame() {
        let data = &[
            0x81, 0x85, // FIN + Text, MASK + len=5
            0x37, 0xfa, 0x21, 0x3d, // Mask key
            0x7f, 0x9f, 0x4d, 0x51, 0x58, // Masked "Hello"
        ];
        let (frame, len) = Frame::parse(data).unwrap();
        assert_eq!(len, 11);
        assert_eq!(frame.mask_key(), Some([0x37, 0xfa, 0x21, 0x3d]));
        assert_eq!(frame.payload(), b"Hello");
    }

    // --------------------------------------------------------------------------
    // Test 3: Byte-at-a-time delivery
    // --------------------------------------------------------------------------
    #[test]
    fn test_append_one_byte_at_a_time() {
        let data = [0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58];
        let mut frame = Frame::empty();
        for (i, byte) in data.iter().enumerate() {
            assert!(!frame.is_complete(), "complete too early at byte {i}");
            frame.append_bytes(&[*byte][..]).unwrap();
        }
        assert!(frame.is_complete());
        assert_eq!(frame.payload(), &[0x7f, 0x9f, 0x4d, 0x51, 0x58]);
        frame.unmask_payload();
        assert_eq!(frame.payload(), b"Hello");
        assert!(frame.extract_overflow().is_empty());
    }

    // --------------------------------------------------------------------------
    // Test 4: Parse states
    // --------------------------------------------------------------------------
    #[test]
    fn test_parse_states() {
        let mut frame = Frame::empty();
        assert_eq!(frame.state(), FrameState::HeaderPending);
        assert_eq!(frame.bytes_needed(), 2);

        frame.append_bytes(&[0x82, 0x7e][..]).unwrap();
        assert_eq!(frame.state(), FrameState::HeaderPending);
        assert_eq!(frame.bytes_needed(), 2);

        frame.append_bytes(&[0x01, 0x00, 0xAA][..]).unwrap();
        assert_eq!(frame.state(), FrameState::PayloadPending);
        assert_eq!(frame.payload_len(), 256);
        assert_eq!(frame.bytes_needed(), 255);

        frame.append_bytes(&[0xAA; 255][..]).unwrap();
        assert_eq!(frame.state(), FrameState::Complete);
    }

    // --------------------------------------------------------------------------
    // Test 5: Overflow past the frame boundary
    // --------------------------------------------------------------------------
    #[test]
    fn test_extract_overflow() {
        let mut frame = Frame::empty();
        frame
            .append_bytes(Bytes::from_static(&[0x89, 0x01, b'x', 0x8a, 0x00]))
            .unwrap();
        assert!(frame.is_complete());
        assert_eq!(frame.opcode, OpCode::Ping);
        assert_eq!(frame.extract_overflow().as_ref(), &[0x8a, 0x00]);
        assert!(frame.extract_overflow().is_empty());
    }

    #[test]
    fn test_append_after_complete_goes_to_overflow() {
        let mut frame = Frame::empty();
        frame.append_bytes(&[0x81, 0x00, 0x01][..]).unwrap();
        frame.append_bytes(&[0x02][..]).unwrap();
        assert_eq!(frame.extract_overflow().as_ref(), &[0x01, 0x02]);
    }

    // --------------------------------------------------------------------------
    // Test 6: Extended payload lengths
    // --------------------------------------------------------------------------
    #[test]
    fn test_parse_extended_length_126() {
        let mut data = vec![0x82, 0x7e, 0x01, 0x00]; // len=256
        data.extend(vec![0xab; 256]);

        let (frame, len) = Frame::parse(&data).unwrap();
        assert_eq!(len, 4 + 256);
        assert_eq!(frame.payload().len(), 256);
        assert!(frame.payload().iter().all(|&b| b == 0xab));
    }

    #[test]
    fn test_parse_extended_length_127() {
        let mut data = vec![0x82, 0x7f];
        data.extend(65536u64.to_be_bytes());
        data.extend(vec![0xcd; 65536]);

        let (frame, len) = Frame::parse(&data).unwrap();
        assert_eq!(len, 10 + 65536);
        assert_eq!(frame.payload().len(), 65536);
    }

    // --------------------------------------------------------------------------
    // Test 7: Empty payload completes on the header alone
    // --------------------------------------------------------------------------
    #[test]
    fn test_parse_empty_payload() {
        let (frame, len) = Frame::parse(&[0x81, 0x00]).unwrap();
        assert_eq!(len, 2);
        assert!(frame.is_complete());
        assert_eq!(frame.payload(), b"");
    }

    // --------------------------------------------------------------------------
    // Test 8: Invalid 64-bit lengths
    // --------------------------------------------------------------------------
    #[test]
    fn test_length_with_top_bit_set() {
        let mut data = vec![0x82, 0x7f];
        data.extend(u64::MAX.to_be_bytes());
        assert_eq!(
            Frame::parse(&data).unwrap_err(),
            Error::InvalidPayloadLength(u64::MAX)
        );

        let mut data = vec![0x82, 0x7f];
        data.extend((1u64 << 63).to_be_bytes());
        assert!(matches!(
            Frame::parse(&data),
            Err(Error::InvalidPayloadLength(_))
        ));
    }

    #[test]
    fn test_large_valid_length_header_only() {
        // A legal 63-bit length decodes; only the payload is missing.
        let mut frame = Frame::empty();
        let mut data = vec![0x82, 0x7f];
        data.extend(0x7FFF_FFFFu64.to_be_bytes());
        frame.append_bytes(&data[..]).unwrap();
        assert_eq!(frame.state(), FrameState::PayloadPending);
        assert_eq!(frame.payload_len(), 0x7FFF_FFFF);
    }

    // --------------------------------------------------------------------------
    // Test 9: Reserved opcodes
    // --------------------------------------------------------------------------
    #[test]
    fn test_parse_reserved_opcode() {
        assert_eq!(
            Frame::parse(&[0x83, 0x00]).unwrap_err(),
            Error::ReservedOpcode(0x3)
        );
        assert_eq!(
            Frame::parse(&[0x8B, 0x00]).unwrap_err(),
            Error::ReservedOpcode(0xB)
        );
    }

    // --------------------------------------------------------------------------
    // Test 10: Incomplete input
    // --------------------------------------------------------------------------
    #[test]
    fn test_parse_incomplete() {
        assert_eq!(
            Frame::parse(&[0x81]).unwrap_err(),
            Error::IncompleteFrame { needed: 1 }
        );
        assert_eq!(
            Frame::parse(&[0x81, 0x05, 0x48]).unwrap_err(),
            Error::IncompleteFrame { needed: 4 }
        );
        assert_eq!(
            Frame::parse(&[0x82, 0x7e, 0x01]).unwrap_err(),
            Error::IncompleteFrame { needed: 1 }
        );
        assert_eq!(
            Frame::parse(&[0x81, 0x85, 0x37, 0xfa]).unwrap_err(),
            Error::IncompleteFrame { needed: 2 }
        );
    }

    // --------------------------------------------------------------------------
    // Test 11: Masking is tracked and idempotent
    // --------------------------------------------------------------------------
    #[test]
    fn test_mask_unmask_idempotent() {
        let mut frame = Frame::text("Hello");
        frame.set_mask([0x37, 0xfa, 0x21, 0x3d]);

        frame.mask_payload();
        frame.mask_payload();
        assert_eq!(frame.payload(), &[0x7f, 0x9f, 0x4d, 0x51, 0x58]);

        frame.unmask_payload();
        frame.unmask_payload();
        assert_eq!(frame.payload(), b"Hello");
    }

    #[test]
    fn test_set_mask_replaces_previous_key() {
        let mut frame = Frame::binary(vec![1, 2, 3, 4]);
        frame.set_mask([9, 9, 9, 9]);
        frame.mask_payload();
        frame.set_mask([1, 1, 1, 1]);
        assert_eq!(frame.payload(), &[1, 2, 3, 4]);
    }

    // --------------------------------------------------------------------------
    // Test 12: Encoding
    // --------------------------------------------------------------------------
    #[test]
    fn test_encode_unmasked_text_frame() {
        let frame = Frame::text(b"Hello".to_vec());
        assert_eq!(
            frame.to_bytes().as_ref(),
            &[0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]
        );
    }

    #[test]
    fn test_encode_masked_matches_rfc() {
        let expected = [0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58];
        let mut frame = Frame::text("Hello");
        frame.set_mask([0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(frame.to_bytes().as_ref(), &expected);

        // Already-masked payloads are written as held.
        frame.mask_payload();
        assert_eq!(frame.to_bytes().as_ref(), &expected);
    }

    #[test]
    fn test_encode_length_forms() {
        for (len, header) in [(125usize, 2usize), (126, 4), (65535, 4), (65536, 10)] {
            let frame = Frame::binary(vec![0u8; len]);
            let bytes = frame.to_bytes();
            assert_eq!(bytes.len(), header + len, "length {len}");
            assert_eq!(frame.wire_size(), bytes.len());
        }
    }

    #[test]
    fn test_encode_rsv1() {
        let bytes = Frame::text("x").with_rsv1(true).to_bytes();
        assert_eq!(bytes[0], 0xC1);
    }

    // --------------------------------------------------------------------------
    // Test 13: Close helpers
    // --------------------------------------------------------------------------
    #[test]
    fn test_close_frame_helpers() {
        let frame = Frame::close(CloseCode::Normal, "bye");
        assert_eq!(frame.opcode, OpCode::Close);
        assert_eq!(frame.payload(), &[0x03, 0xe8, b'b', b'y', b'e']);
        assert_eq!(frame.close_code(), Some(CloseCode::Normal));
        assert_eq!(frame.close_reason(), Some("bye"));

        let empty = Frame::new(true, OpCode::Close, Vec::new());
        assert_eq!(empty.close_code(), None);
        assert_eq!(Frame::ping("x").close_code(), None);
    }
}

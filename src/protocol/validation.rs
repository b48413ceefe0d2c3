//! Protocol-rule checks for incoming frames (RFC 6455 Section 5).
//!
//! Header checks run as soon as a frame's header is decoded, before any of
//! its payload is buffered:
//! - Masking rules per RFC 6455 Section 5.1
//! - RSV bits, with RSV1 reserved for permessage-deflate
//! - Control frame shape (Section 5.5)
//! - Fragmentation sequencing (Section 5.4)
//! - Frame and message size limits against the declared length

use crate::config::Limits;
use crate::connection::Role;
use crate::error::{Error, Result};
use crate::message::CloseFrame;
use crate::protocol::frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD};
use crate::protocol::OpCode;

/// Frame validator for incoming WebSocket frames.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    /// Connection role (Client or Server).
    role: Role,
    /// Size limits for frames and messages.
    limits: Limits,
    /// Whether permessage-deflate was negotiated, allowing RSV1.
    compression: bool,
}

impl FrameValidator {
    /// Create a validator for a connection without extensions.
    pub fn new(role: Role, limits: Limits) -> Self {
        Self {
            role,
            limits,
            compression: false,
        }
    }

    /// Allow RSV1 on the first frame of data messages.
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Limits this validator enforces.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Validate a decoded frame header.
    ///
    /// `message_len` is the number of payload bytes already buffered for the
    /// message in assembly, or `None` when no message is in progress.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` / `Error::MaskedServerFrame` on a mask
    ///   that contradicts the connection role
    /// - `Error::ReservedBitsSet` for RSV2/RSV3, or RSV1 where not allowed
    /// - `Error::FragmentedControlFrame` / `Error::ControlFrameTooLarge`
    /// - `Error::ProtocolViolation` for out-of-sequence data frames
    /// - `Error::FrameTooLarge` / `Error::MessageTooLarge` on size limits
    pub fn validate_header(&self, frame: &Frame, message_len: Option<usize>) -> Result<()> {
        self.validate_masking(frame.is_masked())?;
        self.validate_rsv_bits(frame)?;

        let payload_len = frame.payload_len();
        if frame.opcode.is_control() {
            check_control_frame(frame.fin, payload_len)?;
            return self.limits.check_frame_size(payload_len);
        }

        match (frame.opcode, message_len) {
            (OpCode::Continuation, None) => {
                return Err(Error::ProtocolViolation(
                    "continuation frame without a message in progress".into(),
                ));
            }
            (OpCode::Text | OpCode::Binary, Some(_)) => {
                return Err(Error::ProtocolViolation(format!(
                    "{} frame while a fragmented message is in progress",
                    frame.opcode
                )));
            }
            _ => {}
        }

        self.limits.check_frame_size(payload_len)?;
        self.limits
            .check_message_size(message_len.unwrap_or(0).saturating_add(payload_len))
    }

    /// Validate masking rules per RFC 6455 Section 5.1.
    fn validate_masking(&self, masked: bool) -> Result<()> {
        match (self.role.expects_masked(), masked) {
            (true, false) => Err(Error::UnmaskedClientFrame),
            (false, true) => Err(Error::MaskedServerFrame),
            _ => Ok(()),
        }
    }

    /// RSV2 and RSV3 have no negotiated meaning. RSV1 marks a compressed
    /// message and therefore only appears on a Text or Binary frame.
    fn validate_rsv_bits(&self, frame: &Frame) -> Result<()> {
        if frame.rsv2 || frame.rsv3 {
            return Err(Error::ReservedBitsSet);
        }
        if frame.rsv1
            && !(self.compression && matches!(frame.opcode, OpCode::Text | OpCode::Binary))
        {
            return Err(Error::ReservedBitsSet);
        }
        Ok(())
    }
}

/// Control frames must be final and carry at most 125 payload bytes.
///
/// # Errors
///
/// Returns `Error::FragmentedControlFrame` or `Error::ControlFrameTooLarge`.
pub fn check_control_frame(fin: bool, payload_len: usize) -> Result<()> {
    if !fin {
        return Err(Error::FragmentedControlFrame);
    }
    if payload_len > MAX_CONTROL_FRAME_PAYLOAD {
        return Err(Error::ControlFrameTooLarge(payload_len));
    }
    Ok(())
}

/// Validate the payload of a received Close frame.
///
/// # Errors
///
/// See [`CloseFrame::parse`].
pub fn validate_close_payload(payload: &[u8]) -> Result<()> {
    CloseFrame::parse(payload).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(bytes: &[u8]) -> Frame {
        let mut frame = Frame::empty();
        let mut cursor = bytes;
        assert!(frame.append_header(&mut cursor).unwrap());
        frame
    }

    /// Masked client-to-server header with the given first byte and length.
    fn masked(byte0: u8, len: u8) -> Frame {
        header(&[byte0, 0x80 | len, 1, 2, 3, 4])
    }

    fn unmasked(byte0: u8, len: u8) -> Frame {
        header(&[byte0, len])
    }

    // --------------------------------------------------------------------------
    // Masking validation tests (RFC 6455 Section 5.1)
    // --------------------------------------------------------------------------

    #[test]
    fn test_server_rejects_unmasked_client_frame() {
        let validator = FrameValidator::new(Role::Server, Limits::default());
        assert_eq!(
            validator.validate_header(&unmasked(0x82, 10), None),
            Err(Error::UnmaskedClientFrame)
        );
    }

    #[test]
    fn test_server_accepts_masked_client_frame() {
        let validator = FrameValidator::new(Role::Server, Limits::default());
        assert!(validator.validate_header(&masked(0x82, 10), None).is_ok());
    }

    #[test]
    fn test_client_rejects_masked_server_frame() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        assert_eq!(
            validator.validate_header(&masked(0x82, 10), None),
            Err(Error::MaskedServerFrame)
        );
    }

    #[test]
    fn test_client_accepts_unmasked_server_frame() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        assert!(validator.validate_header(&unmasked(0x82, 10), None).is_ok());
    }

    // --------------------------------------------------------------------------
    // RSV bits validation tests (RFC 6455 Section 5.2, RFC 7692 Section 6)
    // --------------------------------------------------------------------------

    #[test]
    fn test_rejects_rsv1_without_compression() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        assert_eq!(
            validator.validate_header(&unmasked(0xC1, 1), None),
            Err(Error::ReservedBitsSet)
        );
    }

    #[test]
    fn test_accepts_rsv1_on_first_data_frame_with_compression() {
        let validator =
            FrameValidator::new(Role::Client, Limits::default()).with_compression(true);
        assert!(validator.validate_header(&unmasked(0xC1, 1), None).is_ok());
        assert!(validator.validate_header(&unmasked(0x42, 1), None).is_ok());
    }

    #[test]
    fn test_rejects_rsv1_on_continuation_and_control() {
        let validator =
            FrameValidator::new(Role::Client, Limits::default()).with_compression(true);
        assert_eq!(
            validator.validate_header(&unmasked(0xC0, 1), Some(5)),
            Err(Error::ReservedBitsSet)
        );
        assert_eq!(
            validator.validate_header(&unmasked(0xC9, 1), None),
            Err(Error::ReservedBitsSet)
        );
    }

    #[test]
    fn test_rejects_rsv2_and_rsv3_even_with_compression() {
        let validator =
            FrameValidator::new(Role::Client, Limits::default()).with_compression(true);
        for byte0 in [0xA1, 0x91, 0xF1] {
            assert_eq!(
                validator.validate_header(&unmasked(byte0, 1), None),
                Err(Error::ReservedBitsSet),
                "byte0 {byte0:#x}"
            );
        }
    }

    // --------------------------------------------------------------------------
    // Control frames
    // --------------------------------------------------------------------------

    #[test]
    fn test_fragmented_control_frame() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        assert_eq!(
            validator.validate_header(&unmasked(0x09, 0), None),
            Err(Error::FragmentedControlFrame)
        );
    }

    #[test]
    fn test_control_frame_too_large() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        let frame = header(&[0x89, 126, 0x00, 126]);
        assert_eq!(
            validator.validate_header(&frame, None),
            Err(Error::ControlFrameTooLarge(126))
        );
        assert!(check_control_frame(true, MAX_CONTROL_FRAME_PAYLOAD).is_ok());
    }

    #[test]
    fn test_control_frame_allowed_mid_message() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        assert!(validator.validate_header(&unmasked(0x8A, 0), Some(100)).is_ok());
    }

    #[test]
    fn test_control_frames_ignore_message_limit() {
        let limits = Limits::new(0, 10).unwrap();
        let validator = FrameValidator::new(Role::Client, limits);
        assert!(validator.validate_header(&unmasked(0x89, 100), Some(10)).is_ok());
    }

    #[test]
    fn test_control_frames_obey_frame_limit() {
        let validator = FrameValidator::new(Role::Client, Limits::new(10, 0).unwrap());
        assert!(validator.validate_header(&unmasked(0x89, 10), None).is_ok());
        assert_eq!(
            validator.validate_header(&unmasked(0x8A, 11), Some(4)),
            Err(Error::FrameTooLarge { size: 11, max: 10 })
        );
    }

    // --------------------------------------------------------------------------
    // Fragmentation sequencing
    // --------------------------------------------------------------------------

    #[test]
    fn test_continuation_without_message() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        assert!(matches!(
            validator.validate_header(&unmasked(0x80, 1), None),
            Err(Error::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_new_message_while_fragmented() {
        let validator = FrameValidator::new(Role::Client, Limits::default());
        assert!(matches!(
            validator.validate_header(&unmasked(0x81, 1), Some(3)),
            Err(Error::ProtocolViolation(_))
        ));
        assert!(validator.validate_header(&unmasked(0x80, 1), Some(3)).is_ok());
    }

    // --------------------------------------------------------------------------
    // Size limits
    // --------------------------------------------------------------------------

    #[test]
    fn test_rejects_frame_exceeding_limit() {
        let validator = FrameValidator::new(Role::Client, Limits::new(100, 0).unwrap());
        let frame = header(&[0x82, 126, 0x00, 200]);
        assert_eq!(
            validator.validate_header(&frame, None),
            Err(Error::FrameTooLarge {
                size: 200,
                max: 100
            })
        );
    }

    #[test]
    fn test_accepts_frame_at_exact_limit() {
        let validator = FrameValidator::new(Role::Client, Limits::new(100, 0).unwrap());
        assert!(validator.validate_header(&unmasked(0x82, 100), None).is_ok());
    }

    #[test]
    fn test_rejects_cumulative_message_size() {
        let validator = FrameValidator::new(Role::Client, Limits::new(0, 100).unwrap());
        assert!(validator.validate_header(&unmasked(0x80, 50), Some(50)).is_ok());
        assert_eq!(
            validator.validate_header(&unmasked(0x80, 51), Some(50)),
            Err(Error::MessageTooLarge {
                size: 101,
                max: 100
            })
        );
    }

    #[test]
    fn test_masking_checked_before_rsv() {
        let validator = FrameValidator::new(Role::Server, Limits::default());
        assert_eq!(
            validator.validate_header(&unmasked(0xC1, 1), None),
            Err(Error::UnmaskedClientFrame)
        );
    }

    #[test]
    fn test_rsv_checked_before_size() {
        let validator = FrameValidator::new(Role::Client, Limits::new(10, 10).unwrap());
        assert_eq!(
            validator.validate_header(&unmasked(0xE2, 100), None),
            Err(Error::ReservedBitsSet)
        );
    }

    // --------------------------------------------------------------------------
    // Close payloads
    // --------------------------------------------------------------------------

    #[test]
    fn test_close_payloads() {
        assert!(validate_close_payload(&[]).is_ok());
        assert!(validate_close_payload(&[0x03, 0xE8]).is_ok());
        assert!(validate_close_payload(&[0x0F, 0xA0, b'o', b'k']).is_ok()); // 4000
        assert!(matches!(
            validate_close_payload(&[0x03]),
            Err(Error::ProtocolViolation(_))
        ));
        assert_eq!(
            validate_close_payload(&[0x03, 0xF4]), // 1012
            Err(Error::InvalidCloseCode(1012))
        );
        assert_eq!(
            validate_close_payload(&[0x03, 0xE8, 0xC0, 0x80]),
            Err(Error::InvalidUtf8)
        );
    }
}

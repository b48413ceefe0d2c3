//! Outbound half of a connection: messages to serialized frames.

use bytes::BytesMut;

use crate::config::Config;
use crate::connection::Role;
use crate::connection::fragmenter::MessageFragmenter;
use crate::error::{Error, Result};
use crate::extensions::{DeflateConfig, Deflater, PermessageDeflateOptions};
use crate::message::{CloseCode, Message};
use crate::protocol::validation::check_control_frame;
use crate::protocol::{Frame, OpCode, random_mask};

/// Destination for serialized frames.
pub trait ByteSink {
    /// Accept one serialized frame.
    ///
    /// # Errors
    ///
    /// Implementations report transport failures as [`Error::Io`].
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

impl ByteSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl ByteSink for BytesMut {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Adapter writing frames to any [`std::io::Write`].
#[derive(Debug)]
pub struct IoSink<W>(pub W);

impl<W: std::io::Write> ByteSink for IoSink<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.0.write_all(bytes)?;
        Ok(())
    }
}

/// Serializes outgoing messages for one connection.
///
/// Clients mask every frame with a fresh random key. Data messages larger
/// than the configured fragment size are split, and with permessage-deflate
/// the whole message is compressed before splitting.
#[derive(Debug)]
pub struct MessageWriter {
    role: Role,
    fragment_size: usize,
    deflater: Option<Deflater>,
    /// Opcode of a message started with [`send_fragment`](Self::send_fragment).
    streaming: Option<OpCode>,
    closed: bool,
    scratch: BytesMut,
}

impl MessageWriter {
    /// Writer for a connection without compression.
    pub fn new(config: &Config) -> Self {
        Self {
            role: config.role,
            fragment_size: config.fragment_size,
            deflater: None,
            streaming: None,
            closed: false,
            scratch: BytesMut::new(),
        }
    }

    /// Writer for a connection that negotiated `options`.
    pub fn with_deflate(config: &Config, options: &PermessageDeflateOptions) -> Self {
        let mut writer = Self::new(config);
        if options.enabled {
            let level = config
                .deflate
                .as_ref()
                .map_or(DeflateConfig::default().compression_level, |d| {
                    d.compression_level
                });
            writer.deflater = Some(Deflater::for_role(options, config.role, level));
        }
        writer
    }

    /// Whether a Close frame has been sent.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Send any message.
    ///
    /// # Errors
    ///
    /// See the individual `send_*` methods.
    pub fn send<S: ByteSink + ?Sized>(&mut self, sink: &mut S, message: &Message) -> Result<()> {
        match message {
            Message::Text(text) => self.send_text(sink, text),
            Message::Binary(data) => self.send_binary(sink, data),
            Message::Ping(data) => self.send_ping(sink, data),
            Message::Pong(data) => self.send_pong(sink, data),
            Message::Close(None) => {
                self.send_control(sink, Frame::new(true, OpCode::Close, Vec::new()))
            }
            Message::Close(Some(close)) => self.send_close(sink, close.code, &close.reason),
        }
    }

    /// Send a text message.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` after a Close frame was sent
    /// - `Error::ProtocolViolation` while a streamed message is open
    /// - `Error::Compression` / `Error::Io` from the deflater or sink
    pub fn send_text<S: ByteSink + ?Sized>(&mut self, sink: &mut S, text: &str) -> Result<()> {
        self.send_data(sink, OpCode::Text, text.as_bytes())
    }

    /// Send a binary message.
    ///
    /// # Errors
    ///
    /// Same as [`send_text`](Self::send_text).
    pub fn send_binary<S: ByteSink + ?Sized>(&mut self, sink: &mut S, data: &[u8]) -> Result<()> {
        self.send_data(sink, OpCode::Binary, data)
    }

    /// Send a Ping frame.
    ///
    /// # Errors
    ///
    /// `Error::ControlFrameTooLarge` for payloads over 125 bytes.
    pub fn send_ping<S: ByteSink + ?Sized>(&mut self, sink: &mut S, data: &[u8]) -> Result<()> {
        self.send_control(sink, Frame::ping(data))
    }

    /// Send a Pong frame.
    ///
    /// # Errors
    ///
    /// `Error::ControlFrameTooLarge` for payloads over 125 bytes.
    pub fn send_pong<S: ByteSink + ?Sized>(&mut self, sink: &mut S, data: &[u8]) -> Result<()> {
        self.send_control(sink, Frame::pong(data))
    }

    /// Send a Close frame. Nothing can be sent afterwards.
    ///
    /// # Errors
    ///
    /// `Error::InvalidCloseCode` for codes that may not appear on the wire,
    /// `Error::ControlFrameTooLarge` for reasons over 123 bytes.
    pub fn send_close<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        code: CloseCode,
        reason: &str,
    ) -> Result<()> {
        if !code.is_valid() {
            return Err(Error::InvalidCloseCode(code.as_u16()));
        }
        self.send_control(sink, Frame::close(code, reason))
    }

    /// Send one piece of a message whose total length is not known upfront.
    ///
    /// `opcode` is the message type (Text or Binary) and must stay the same
    /// for every piece; the writer emits Continuation frames after the first.
    /// `fin` ends the message. Control frames may be sent between pieces.
    /// Text pieces are not checked for UTF-8.
    ///
    /// # Errors
    ///
    /// `Error::ProtocolViolation` for a non-data opcode or an opcode that
    /// differs from the open message, plus the errors of
    /// [`send_text`](Self::send_text).
    pub fn send_fragment<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        opcode: OpCode,
        data: &[u8],
        fin: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        if !matches!(opcode, OpCode::Text | OpCode::Binary) {
            return Err(Error::ProtocolViolation(format!(
                "{opcode} cannot start a data message"
            )));
        }
        let first = match self.streaming {
            None => true,
            Some(open) if open == opcode => false,
            Some(open) => {
                return Err(Error::ProtocolViolation(format!(
                    "{opcode} fragment while a {open} message is open"
                )));
            }
        };

        let (payload, compressed) = match self.deflater.as_mut() {
            Some(deflater) => (deflater.compress(data, fin)?, first),
            None => (data.to_vec(), false),
        };
        let frame_opcode = if first { opcode } else { OpCode::Continuation };
        self.write_frame(sink, Frame::new(fin, frame_opcode, payload).with_rsv1(compressed))?;

        self.streaming = if fin { None } else { Some(opcode) };
        Ok(())
    }

    fn send_data<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        opcode: OpCode,
        data: &[u8],
    ) -> Result<()> {
        self.ensure_open()?;
        if let Some(open) = self.streaming {
            return Err(Error::ProtocolViolation(format!(
                "{opcode} message while a streamed {open} message is open"
            )));
        }

        let compressed;
        let deflated;
        let payload = match self.deflater.as_mut() {
            Some(deflater) => {
                deflated = deflater.compress(data, true)?;
                compressed = true;
                deflated.as_slice()
            }
            None => {
                compressed = false;
                data
            }
        };

        let role = self.role;
        let fragmenter =
            MessageFragmenter::new(payload, opcode, self.fragment_size).compressed(compressed);
        for frame in fragmenter {
            Self::encode(role, &mut self.scratch, sink, frame)?;
        }
        Ok(())
    }

    fn send_control<S: ByteSink + ?Sized>(&mut self, sink: &mut S, frame: Frame) -> Result<()> {
        self.ensure_open()?;
        check_control_frame(frame.fin, frame.payload_len())?;
        if frame.opcode == OpCode::Close {
            self.closed = true;
        }
        self.write_frame(sink, frame)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn write_frame<S: ByteSink + ?Sized>(&mut self, sink: &mut S, frame: Frame) -> Result<()> {
        Self::encode(self.role, &mut self.scratch, sink, frame)
    }

    fn encode<S: ByteSink + ?Sized>(
        role: Role,
        scratch: &mut BytesMut,
        sink: &mut S,
        mut frame: Frame,
    ) -> Result<()> {
        if role.must_mask() {
            frame.set_mask(random_mask()?);
        }
        log::trace!(
            "sending {} fin={} rsv1={} len={}",
            frame.opcode,
            frame.fin,
            frame.rsv1,
            frame.payload_len()
        );
        scratch.clear();
        frame.encode_into(scratch);
        sink.write_bytes(scratch)
    }
}

//! Stream-to-message assembly for WebSocket (RFC 6455).
//!
//! [`MessageAssembler`] takes inbound byte chunks of any size, parses them
//! into frames, validates each frame, reassembles fragmented data messages
//! and hands the results to a [`FrameHandler`]. Control frames bypass
//! assembly and are delivered the moment they complete.
//!
//! Any protocol failure is turned into a Close frame carrying the matching
//! status code. That frame goes to [`FrameHandler::on_control`] exactly like
//! a peer-sent control frame, and the assembler ignores all further input.

use bytes::Buf;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extensions::{Inflater, PermessageDeflateOptions};
use crate::message::{CloseFrame, Message};
use crate::protocol::utf8::Utf8Validator;
use crate::protocol::validation::{FrameValidator, validate_close_payload};
use crate::protocol::{Frame, FrameState, OpCode};

/// Receiver of everything the assembler produces.
pub trait FrameHandler {
    /// A complete Text or Binary message.
    fn on_message(&mut self, message: Message);

    /// A Ping, Pong or Close frame, either received or synthesized after a
    /// protocol failure. Payloads are already unmasked.
    fn on_control(&mut self, frame: Frame);
}

/// [`FrameHandler`] built from a pair of closures.
pub struct HandlerFn<M, C> {
    on_message: M,
    on_control: C,
}

/// Wrap two closures as a [`FrameHandler`].
pub fn handler_fn<M, C>(on_message: M, on_control: C) -> HandlerFn<M, C>
where
    M: FnMut(Message),
    C: FnMut(Frame),
{
    HandlerFn {
        on_message,
        on_control,
    }
}

impl<M, C> FrameHandler for HandlerFn<M, C>
where
    M: FnMut(Message),
    C: FnMut(Frame),
{
    fn on_message(&mut self, message: Message) {
        (self.on_message)(message);
    }

    fn on_control(&mut self, frame: Frame) {
        (self.on_control)(frame);
    }
}

/// Where the assembler is between two chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Nothing buffered.
    AwaitingFrame,
    /// Part of a frame has been received.
    FrameInProgress,
    /// A fragmented data message is open, waiting for its next frame.
    MessageInProgress,
    /// The final frame of a message is complete and being delivered.
    AwaitingDispatch,
    /// A Close frame was received or synthesized; input is ignored.
    Closed,
}

/// A data message whose final frame has not arrived yet.
#[derive(Debug)]
struct PartialMessage {
    opcode: OpCode,
    /// RSV1 on the first frame.
    compressed: bool,
    payload: Vec<u8>,
    /// Fail-fast check for uncompressed text.
    utf8: Option<Utf8Validator>,
}

impl PartialMessage {
    fn start(frame: &Frame) -> Self {
        let utf8 = (frame.opcode == OpCode::Text && !frame.rsv1).then(Utf8Validator::new);
        Self {
            opcode: frame.opcode,
            compressed: frame.rsv1,
            payload: Vec::new(),
            utf8,
        }
    }
}

/// Per-connection inbound state machine.
#[derive(Debug)]
pub struct MessageAssembler {
    validator: FrameValidator,
    inflater: Option<Inflater>,
    frame: Option<Frame>,
    message: Option<PartialMessage>,
    state: AssemblerState,
}

impl MessageAssembler {
    /// Assembler for a connection without compression.
    pub fn new(config: &Config) -> Self {
        Self {
            validator: FrameValidator::new(config.role, config.limits.clone()),
            inflater: None,
            frame: None,
            message: None,
            state: AssemblerState::AwaitingFrame,
        }
    }

    /// Assembler for a connection that negotiated `options`.
    ///
    /// RSV1 is accepted on the first frame of a data message only when
    /// `options.enabled` is set.
    pub fn with_deflate(config: &Config, options: &PermessageDeflateOptions) -> Self {
        let mut assembler = Self::new(config);
        if options.enabled {
            assembler.validator = assembler.validator.with_compression(true);
            assembler.inflater = Some(Inflater::for_role(options, config.role));
        }
        assembler
    }

    /// Current state.
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Whether a Close frame has ended the input.
    pub fn is_closed(&self) -> bool {
        self.state == AssemblerState::Closed
    }

    /// Feed a chunk of inbound bytes.
    ///
    /// Chunks may split frames anywhere. Every frame completed by this chunk
    /// is processed before returning, in order, without recursion.
    pub fn feed<H: FrameHandler + ?Sized>(&mut self, chunk: &[u8], handler: &mut H) {
        if self.is_closed() {
            return;
        }
        let mut data = chunk;
        while data.has_remaining() {
            match self.advance(&mut data, handler) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    self.fail(err, handler);
                    return;
                }
            }
        }
        self.state = self.resting_state();
    }

    /// Consume bytes for one frame. Returns `false` when more input is
    /// needed or the connection is closed.
    fn advance<B: Buf, H: FrameHandler + ?Sized>(
        &mut self,
        data: &mut B,
        handler: &mut H,
    ) -> Result<bool> {
        let mut frame = self.frame.take().unwrap_or_default();
        let fresh_header = frame.state() == FrameState::HeaderPending;

        if !frame.append_header(data)? {
            self.frame = Some(frame);
            return Ok(false);
        }
        if fresh_header {
            let message_len = self.message.as_ref().map(|m| m.payload.len());
            self.validator.validate_header(&frame, message_len)?;
            log::trace!(
                "frame header: {} fin={} len={}",
                frame.opcode,
                frame.fin,
                frame.payload_len()
            );
        }

        frame.append_payload(data);
        if !frame.is_complete() {
            self.frame = Some(frame);
            return Ok(false);
        }
        frame.unmask_payload();

        if frame.opcode.is_control() {
            self.handle_control(frame, handler)?;
        } else {
            self.handle_data(frame, handler)?;
        }
        Ok(!self.is_closed())
    }

    fn handle_control<H: FrameHandler + ?Sized>(
        &mut self,
        frame: Frame,
        handler: &mut H,
    ) -> Result<()> {
        if frame.opcode == OpCode::Close {
            validate_close_payload(frame.payload())?;
            log::debug!("peer sent close: {:?}", frame.close_code());
            self.message = None;
            self.state = AssemblerState::Closed;
        }
        handler.on_control(frame);
        Ok(())
    }

    fn handle_data<H: FrameHandler + ?Sized>(
        &mut self,
        frame: Frame,
        handler: &mut H,
    ) -> Result<()> {
        let message = self
            .message
            .get_or_insert_with(|| PartialMessage::start(&frame));
        if let Some(utf8) = message.utf8.as_mut() {
            utf8.validate(frame.payload(), frame.fin)?;
        }

        let fin = frame.fin;
        if message.payload.is_empty() {
            message.payload = frame.into_payload();
        } else {
            message.payload.extend_from_slice(frame.payload());
        }

        if fin {
            self.state = AssemblerState::AwaitingDispatch;
            if let Some(message) = self.message.take() {
                let message = self.finish(message)?;
                handler.on_message(message);
            }
        }
        Ok(())
    }

    /// Inflate and type-check a message whose final frame has arrived.
    fn finish(&mut self, message: PartialMessage) -> Result<Message> {
        let payload = if message.compressed {
            let max = self.validator.limits().max_message_size;
            self.inflater
                .as_mut()
                .ok_or(Error::ReservedBitsSet)?
                .decompress(&message.payload, max)?
        } else {
            message.payload
        };

        match message.opcode {
            OpCode::Text => String::from_utf8(payload)
                .map(Message::Text)
                .map_err(|_| Error::InvalidUtf8),
            _ => Ok(Message::Binary(payload)),
        }
    }

    /// Synthesize a Close frame for `err` and stop processing.
    fn fail<H: FrameHandler + ?Sized>(&mut self, err: Error, handler: &mut H) {
        let close = CloseFrame::truncated(err.close_code(), &err.to_string());
        log::debug!(
            "closing connection with {}: {}",
            close.code.as_u16(),
            close.reason
        );
        self.frame = None;
        self.message = None;
        self.state = AssemblerState::Closed;
        handler.on_control(Frame::close(close.code, &close.reason));
    }

    fn resting_state(&self) -> AssemblerState {
        if self.is_closed() {
            AssemblerState::Closed
        } else if self.frame.is_some() {
            AssemblerState::FrameInProgress
        } else if self.message.is_some() {
            AssemblerState::MessageInProgress
        } else {
            AssemblerState::AwaitingFrame
        }
    }
}

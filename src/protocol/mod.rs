//! WebSocket protocol core implementation (RFC 6455).

pub mod assembler;
pub mod frame;
pub mod mask;
pub mod opcode;
pub mod utf8;
pub mod validation;

pub use assembler::{AssemblerState, FrameHandler, HandlerFn, MessageAssembler, handler_fn};
pub use frame::{Frame, FrameState, MAX_CONTROL_FRAME_PAYLOAD};
pub use mask::{apply_mask, apply_mask_fast, random_mask};
pub use opcode::OpCode;
pub use utf8::{Utf8Validator, validate_utf8};
pub use validation::{FrameValidator, check_control_frame, validate_close_payload};

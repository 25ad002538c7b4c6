// crates/mcp-framing/src/lib.rs
// ============================================================================
// Module: Framing Codec
// Description: Length-prefixed frame encode/decode plus HTTP status helpers.
// Purpose: Give every byte-stream transport one shared wire format.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Frames on stdio/TCP are a 4-byte big-endian unsigned length followed by
//! exactly that many bytes of UTF-8 JSON. This crate owns encode/decode of
//! that format plus the small closed set of HTTP status codes the transport
//! crate is allowed to emit; it performs no JSON parsing itself.

pub mod frame;
pub mod status;

pub use frame::DEFAULT_MAX_FRAME_BYTES;
pub use frame::FramingError;
pub use frame::read_frame;
pub use frame::read_frame_cancellable;
pub use frame::write_frame;
pub use status::HttpStatus;

// crates/mcp-framing/src/frame.rs
// ============================================================================
// Module: Length-Prefixed Frames
// Description: Encode/decode of the 4-byte big-endian length-prefixed format.
// ============================================================================

use std::io::Read;
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Default maximum payload size accepted by [`read_frame`]: 1 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

const HEADER_LEN: usize = 4;
/// Bytes read per chunk while polling the cancellation flag.
const CANCEL_POLL_CHUNK: usize = 4096;

/// Errors raised while framing or deframing a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// Underlying I/O failure.
    #[error("framing i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The stream ended before a complete frame was read.
    #[error("unexpected end of stream")]
    Eof,
    /// The declared frame length was 0 or exceeded the configured maximum.
    #[error("invalid frame length: {len} (max {max})")]
    InvalidLength {
        /// The length declared by the frame header.
        len: u32,
        /// The maximum length the reader was configured to accept.
        max: usize,
    },
    /// The frame payload was not valid UTF-8.
    #[error("frame payload is not valid utf-8")]
    InvalidUtf8,
    /// The read was cancelled before completion.
    #[error("frame read cancelled")]
    Cancelled,
}

/// Writes one length-prefixed frame: a 4-byte big-endian length header
/// followed by `payload`, then flushes the sink.
///
/// # Errors
/// Returns [`FramingError::Io`] if either write or the flush fails.
pub fn write_frame<W: Write>(sink: &mut W, payload: &[u8]) -> Result<(), FramingError> {
    let len = u32::try_from(payload.len()).map_err(|_| FramingError::InvalidLength {
        len: u32::MAX,
        max: DEFAULT_MAX_FRAME_BYTES,
    })?;
    sink.write_all(&len.to_be_bytes())?;
    sink.write_all(payload)?;
    sink.flush()?;
    Ok(())
}

/// Reads one length-prefixed frame, validating the length against
/// `max_frame_bytes` and the payload as UTF-8.
///
/// # Errors
/// Returns [`FramingError`] on I/O failure, an out-of-range length, EOF
/// mid-frame, or invalid UTF-8.
pub fn read_frame<R: Read>(source: &mut R, max_frame_bytes: usize) -> Result<Vec<u8>, FramingError> {
    read_frame_cancellable(source, max_frame_bytes, None)
}

/// Like [`read_frame`], but polls `cancel` between read chunks so a caller
/// can interrupt a long-running read at a frame boundary.
///
/// # Errors
/// Returns [`FramingError::Cancelled`] if `cancel` is observed set before the
/// frame completes, in addition to the errors [`read_frame`] can return.
pub fn read_frame_cancellable<R: Read>(
    source: &mut R,
    max_frame_bytes: usize,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<u8>, FramingError> {
    let mut header = [0u8; HEADER_LEN];
    read_exact_cancellable(source, &mut header, cancel)?;
    let len = u32::from_be_bytes(header);
    if len == 0 || (len as usize) > max_frame_bytes {
        return Err(FramingError::InvalidLength {
            len,
            max: max_frame_bytes,
        });
    }
    let mut payload = vec![0u8; len as usize];
    read_exact_cancellable(source, &mut payload, cancel)?;
    if std::str::from_utf8(&payload).is_err() {
        return Err(FramingError::InvalidUtf8);
    }
    Ok(payload)
}

/// Reads exactly `buf.len()` bytes, checking `cancel` between chunks.
///
/// # Errors
/// Returns [`FramingError::Eof`] on premature stream close,
/// [`FramingError::Cancelled`] if cancellation is observed, or
/// [`FramingError::Io`] on other I/O failure.
fn read_exact_cancellable<R: Read>(
    source: &mut R,
    buf: &mut [u8],
    cancel: Option<&AtomicBool>,
) -> Result<(), FramingError> {
    let mut filled = 0;
    while filled < buf.len() {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(FramingError::Cancelled);
            }
        }
        let end = (filled + CANCEL_POLL_CHUNK).min(buf.len());
        let read = source.read(&mut buf[filled..end])?;
        if read == 0 {
            return Err(FramingError::Eof);
        }
        filled += read;
    }
    Ok(())
}

// crates/mcp-transport/src/stdio.rs
// ============================================================================
// Module: Stdio Transport
// Description: Length-prefixed frames over the process's stdin/stdout.
// ============================================================================

use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use mcp_framing::FramingError;
use mcp_framing::read_frame_cancellable;
use mcp_framing::write_frame;

use crate::callback::ClientId;
use crate::callback::MessageCallback;

/// Errors raised by the stdio transport's reader loop.
#[derive(Debug, thiserror::Error)]
pub enum StdioTransportError {
    /// Framing failure while reading or writing a frame.
    #[error("stdio framing error: {0}")]
    Framing(#[from] FramingError),
}

/// Reads length-prefixed requests from stdin and writes length-prefixed
/// responses to stdout, one reader thread driving the whole lifecycle.
///
/// There is no peer identity for stdio; every inbound message is attributed
/// to [`ClientId::STDIO`].
pub struct StdioTransport {
    max_frame_bytes: usize,
    cancel: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl StdioTransport {
    /// Builds a stdio transport with the given maximum frame size.
    #[must_use]
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes,
            cancel: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Starts the reader loop on a dedicated thread, invoking `callback` for
    /// each complete request and writing back any returned response.
    pub fn start(&self, callback: MessageCallback) {
        let max_frame_bytes = self.max_frame_bytes;
        let cancel = Arc::clone(&self.cancel);
        let handle = thread::spawn(move || {
            let mut reader = BufReader::new(std::io::stdin());
            let stdout = Arc::new(Mutex::new(std::io::stdout()));
            loop {
                if cancel.load(Ordering::Acquire) {
                    break;
                }
                match read_frame_cancellable(&mut reader, max_frame_bytes, Some(&cancel)) {
                    Ok(payload) => {
                        let response = callback(ClientId::new(ClientId::STDIO), payload);
                        if let Some(response) = response {
                            let mut out = stdout.lock().unwrap_or_else(|poison| poison.into_inner());
                            let _ = write_response(&mut out, &response);
                        }
                    }
                    Err(FramingError::Cancelled) | Err(FramingError::Eof) => break,
                    Err(_) => break,
                }
            }
        });
        *self.handle.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(handle);
    }

    /// Signals the reader loop to stop and waits for it to finish. Because
    /// the reader blocks on stdin, shutdown only completes once the next
    /// frame boundary (or EOF) is reached.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
        let handle = self.handle.lock().unwrap_or_else(|poison| poison.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Blocks until the reader loop exits on its own, typically because
    /// stdin reached EOF. Does not signal cancellation; pair with a signal
    /// handler calling [`stop`](Self::stop) to support both exit paths.
    pub fn join(&self) {
        let handle = self.handle.lock().unwrap_or_else(|poison| poison.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn write_response<W: Write>(sink: &mut W, payload: &[u8]) -> Result<(), StdioTransportError> {
    write_frame(sink, payload)?;
    Ok(())
}

// crates/mcp-transport/src/tcp.rs
// ============================================================================
// Module: TCP Transport
// Description: Length-prefixed frames over accepted TCP connections.
// ============================================================================

use std::io::Write;
use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use mcp_framing::FramingError;
use mcp_framing::read_frame;
use mcp_framing::write_frame;

use crate::callback::ClientId;
use crate::callback::MessageCallback;

/// TCP transport configuration.
#[derive(Debug, Clone, Copy)]
pub struct TcpTransportConfig {
    /// Maximum accepted frame payload size.
    pub max_frame_bytes: usize,
    /// Connections idle for longer than this are closed. `None` disables
    /// the idle timeout.
    pub idle_timeout: Option<Duration>,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: mcp_framing::DEFAULT_MAX_FRAME_BYTES,
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Errors raised while starting the TCP transport.
#[derive(Debug, thiserror::Error)]
pub enum TcpTransportError {
    /// Binding the listening socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Binds a listening socket and spawns one handler thread per accepted
/// connection, each looping over framed reads until the peer closes, the
/// connection goes idle past the configured timeout, or a framing error
/// occurs.
pub struct TcpTransport {
    config: TcpTransportConfig,
    stop: Arc<AtomicBool>,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TcpTransport {
    /// Binds `addr` without starting the accept loop yet.
    ///
    /// # Errors
    /// Returns [`TcpTransportError::Bind`] if the address cannot be bound.
    pub fn bind(addr: &str, config: TcpTransportConfig) -> Result<(Self, TcpListener), TcpTransportError> {
        let listener = TcpListener::bind(addr).map_err(|source| TcpTransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok((
            Self {
                config,
                stop: Arc::new(AtomicBool::new(false)),
                accept_handle: Mutex::new(None),
            },
            listener,
        ))
    }

    /// Starts the accept loop on a dedicated thread, spawning one handler
    /// thread per accepted connection.
    pub fn start(&self, listener: TcpListener, callback: MessageCallback) {
        let stop = Arc::clone(&self.stop);
        let config = self.config;
        let handle = thread::spawn(move || {
            let _ = listener.set_nonblocking(true);
            let mut client_threads = Vec::new();
            while !stop.load(Ordering::Acquire) {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        let _ = listener.set_nonblocking(true);
                        let _ = stream.set_nonblocking(false);
                        let callback = Arc::clone(&callback);
                        let stop = Arc::clone(&stop);
                        let client_id = ClientId::new(addr.to_string());
                        client_threads.push(thread::spawn(move || {
                            handle_connection(stream, client_id, config, callback, &stop);
                        }));
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(20));
                    }
                    Err(_) => break,
                }
            }
            for handle in client_threads {
                let _ = handle.join();
            }
        });
        *self.accept_handle.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(handle);
    }

    /// Signals the accept loop to stop and waits for it and every live
    /// client handler thread to finish.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        let handle = self.accept_handle.lock().unwrap_or_else(|poison| poison.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn handle_connection(
    mut stream: TcpStream,
    client_id: ClientId,
    config: TcpTransportConfig,
    callback: MessageCallback,
    stop: &AtomicBool,
) {
    if let Some(idle_timeout) = config.idle_timeout {
        let _ = stream.set_read_timeout(Some(idle_timeout));
    }
    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        match read_frame(&mut stream, config.max_frame_bytes) {
            Ok(payload) => {
                let response = callback(client_id.clone(), payload);
                if let Some(response) = response {
                    if write_frame(&mut stream, &response).is_err() {
                        break;
                    }
                }
            }
            Err(FramingError::Io(err)) if matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                break;
            }
            Err(_) => break,
        }
    }
    let _ = stream.flush();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::net::TcpStream;
    use std::sync::Mutex as StdMutex;

    use mcp_framing::read_frame;

    use super::*;

    #[test]
    fn echoes_request_bytes_back_to_client() {
        let config = TcpTransportConfig {
            max_frame_bytes: mcp_framing::DEFAULT_MAX_FRAME_BYTES,
            idle_timeout: Some(Duration::from_millis(200)),
        };
        let (transport, listener) = TcpTransport::bind("127.0.0.1:0", config).expect("bind");
        let addr = listener.local_addr().expect("local_addr").to_string();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let callback: MessageCallback = Arc::new(move |client, payload| {
            seen_clone.lock().expect("lock").push(client);
            Some(payload)
        });
        transport.start(listener, callback);

        let mut client = TcpStream::connect(&addr).expect("connect");
        write_frame(&mut client, b"hello").expect("write");
        let reply = read_frame(&mut client, mcp_framing::DEFAULT_MAX_FRAME_BYTES).expect("read");
        assert_eq!(reply, b"hello");

        transport.stop();
        assert_eq!(seen.lock().expect("lock").len(), 1);
    }
}

// crates/mcp-gateway/src/proxy.rs
// ============================================================================
// Module: Gateway Proxy
// Description: Forwards one JSON-RPC request to a matched backend and back.
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use crate::router::Backend;

/// Errors surfaced by [`forward_to_backend`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No pooled connection became available within the acquire deadline.
    #[error("backend {backend} unavailable: {source}")]
    Unavailable {
        /// Name of the backend that could not supply a connection.
        backend: String,
        /// Underlying pool error.
        #[source]
        source: crate::pool::PoolError,
    },
    /// The forward or the bounded reply read failed; the connection is
    /// closed rather than returned to the pool.
    #[error("backend {backend} forwarding failed: {source}")]
    Forwarding {
        /// Name of the backend the exchange failed against.
        backend: String,
        /// Underlying framing error.
        #[source]
        source: mcp_framing::FramingError,
    },
}

/// Forwards `request_payload` (the original request bytes, id untouched) to
/// `backend` and returns the backend's reply bytes verbatim.
///
/// Implements the five-step gateway forwarding sequence: acquire a pooled
/// connection, send the framed request, read the framed reply within
/// `read_timeout`, return the reply, and release the connection to the pool
/// only if the exchange completed cleanly. A failure at any step after
/// acquisition closes the connection instead of returning it.
///
/// # Errors
/// Returns [`GatewayError::Unavailable`] if no connection is acquired before
/// `acquire_deadline`, or [`GatewayError::Forwarding`] if the send or the
/// bounded read fails.
pub fn forward_to_backend(
    backend: &Backend,
    request_payload: &[u8],
    max_frame_bytes: usize,
    acquire_deadline: Instant,
    read_timeout: Duration,
) -> Result<Vec<u8>, GatewayError> {
    let mut conn = backend.pool.acquire(acquire_deadline).map_err(|source| GatewayError::Unavailable {
        backend: backend.name.clone(),
        source,
    })?;
    match crate::pool::forward_framed(&mut conn, request_payload, max_frame_bytes, read_timeout) {
        Ok(reply) => {
            backend.pool.release(conn, true);
            Ok(reply)
        }
        Err(source) => Err(GatewayError::Forwarding {
            backend: backend.name.clone(),
            source,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;
    use std::net::TcpStream;
    use std::thread;

    use mcp_framing::write_frame;

    use super::*;
    use crate::pool::ConnectionPool;
    use crate::pool::PoolConfig;

    fn backend_with_echo_server() -> (Backend, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local_addr").to_string();
        let backend = Backend {
            name: "b1".to_string(),
            tool_names: vec!["echo".to_string()],
            resource_prefixes: Vec::new(),
            resource_templates: Vec::new(),
            pool: ConnectionPool::new(addr, PoolConfig::default()),
        };
        (backend, listener)
    }

    #[test]
    fn forward_returns_backend_reply_and_releases_connection() {
        let (backend, listener) = backend_with_echo_server();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            echo_one_frame(&mut stream);
        });
        let reply = forward_to_backend(
            &backend,
            b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"call_tool\"}",
            1024,
            Instant::now() + Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .expect("forward");
        assert_eq!(reply, b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"call_tool\"}");
        let (in_use, idle) = backend.pool.counts();
        assert_eq!(in_use, 0);
        assert_eq!(idle, 1);
        backend.pool.shutdown();
        server.join().expect("server thread");
    }

    fn echo_one_frame(stream: &mut TcpStream) {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).expect("read header");
        let len = u32::from_be_bytes(header) as usize;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).expect("read payload");
        write_frame(stream, &payload).expect("reply");
    }
}

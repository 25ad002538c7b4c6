// crates/mcp-transport/src/lib.rs
// ============================================================================
// Module: MCP Transport
// Description: Stdio, TCP, and HTTP(+SSE) bindings over the message callback.
// Dependencies: mcp-framing, axum, tokio, tokio-stream, bytes, serde_json
// ============================================================================

//! ## Overview
//! Every transport here delivers complete request payloads to a shared
//! [`MessageCallback`](callback::MessageCallback) and writes back whatever
//! response (if any) the callback returns. Stdio and TCP frame their bytes
//! with `mcp-framing`'s length-prefixed codec on plain OS threads; HTTP runs
//! on a `tokio`/`axum` event loop and layers an SSE fan-out channel on top.

pub mod callback;
pub mod http;
pub mod sse;
pub mod stdio;
pub mod tcp;

pub use callback::ClientId;
pub use callback::MessageCallback;
pub use http::CorsConfig;
pub use http::HttpTransportConfig;
pub use sse::DEFAULT_REPLAY_CAPACITY;
pub use sse::SessionFilter;
pub use sse::SseChannel;
pub use sse::SseEvent;
pub use stdio::StdioTransport;
pub use stdio::StdioTransportError;
pub use tcp::TcpTransport;
pub use tcp::TcpTransportConfig;
pub use tcp::TcpTransportError;

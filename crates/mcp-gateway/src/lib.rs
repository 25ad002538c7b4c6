// crates/mcp-gateway/src/lib.rs
// ============================================================================
// Module: MCP Gateway
// Description: Backend routing, pooled TCP connections, and request proxying.
// Dependencies: mcp-framing, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Gateway mode lets a server proxy requests to one of several registered
//! backends instead of handling them locally. This crate owns the backend
//! config file format, the registration-order router that matches tool
//! names and resource URIs against backend descriptors, the per-backend
//! TCP connection pool with health checks, and the forwarding sequence that
//! ties them together.

pub mod config;
pub mod pool;
pub mod proxy;
pub mod router;

pub use config::BackendDescriptor;
pub use config::BackendRouting;
pub use config::GatewayConfig;
pub use config::GatewayConfigError;
pub use config::load_gateway_config;
pub use pool::ConnectionPool;
pub use pool::PoolConfig;
pub use pool::PoolError;
pub use proxy::GatewayError;
pub use proxy::forward_to_backend;
pub use router::Backend;
pub use router::GatewayRequest;
pub use router::GatewayRouter;

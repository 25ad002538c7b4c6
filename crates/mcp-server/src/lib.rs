// crates/mcp-server/src/lib.rs
// ============================================================================
// Module: MCP Server
// Description: Handler registry, dispatcher, and ambient stack tying
//              mcp-core, mcp-gateway, and mcp-transport into one server.
// Purpose: The facade embedders build against: register handlers, load
//          configuration, start a dispatcher, hand it to a transport.
// Dependencies: mcp-core, mcp-gateway, mcp-transport, mcp-types, serde,
//               serde_json, thiserror, toml
// ============================================================================

//! ## Overview
//! [`server::McpServerBuilder`] registers resources, templates, and tools
//! against their handlers and produces an [`server::McpServer`]. A
//! [`dispatcher::Dispatcher`] wraps that server with a worker pool and
//! exposes it as a transport-facing
//! [`MessageCallback`](mcp_transport::MessageCallback). [`config::ServerConfig`]
//! loads the TOML configuration that sizes the pool, rate limiter, and
//! cache and selects the transport; [`telemetry`] and [`audit`] are the
//! pluggable observability seams the dispatcher reports through.

pub mod audit;
pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod server;
pub mod telemetry;

pub use audit::McpAuditEvent;
pub use audit::McpAuditEventParams;
pub use audit::McpAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::FileAuditSink;
pub use auth::RequestContext;
pub use auth::TokenAuthenticator;
pub use config::ConfigError;
pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use dispatcher::dispatch_request;
pub use handlers::HandlerError;
pub use handlers::ResourceHandler;
pub use handlers::ToolHandler;
pub use handlers::ToolOutcome;
pub use server::BuildError;
pub use server::McpServer;
pub use server::McpServerBuilder;
pub use telemetry::McpMetrics;
pub use telemetry::McpMetricEvent;
pub use telemetry::McpMethod;
pub use telemetry::McpOutcome;
pub use telemetry::NoopMetrics;

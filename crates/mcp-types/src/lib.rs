// crates/mcp-types/src/lib.rs
// ============================================================================
// Module: MCP Types
// Description: Wire-level data model shared by every MCP crate.
// Purpose: Define resources, tools, content items, and the JSON-RPC envelope.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate holds the data model described by the MCP data model section:
//! resources, resource templates, tools, content items, and the JSON-RPC 2.0
//! envelope and error-code taxonomy used to carry them over the wire. Nothing
//! here performs I/O; it is pure data plus the small amount of validation
//! that keeps later stages (registry, dispatcher) honest.

pub mod content;
pub mod error;
pub mod resource;
pub mod rpc;
pub mod tool;

pub use content::ContentItem;
pub use content::ContentType;
pub use error::JsonRpcErrorCode;
pub use resource::Resource;
pub use resource::ResourceTemplate;
pub use rpc::RequestEnvelope;
pub use rpc::ResponseEnvelope;
pub use rpc::RpcError;
pub use tool::Tool;
pub use tool::ToolParameter;

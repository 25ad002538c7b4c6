// crates/mcp-server/src/handlers.rs
// ============================================================================
// Module: Handler Interface
// Description: Resource and tool handler contracts invoked by the dispatcher.
// ============================================================================

//! ## Overview
//! Handlers are plain closures boxed behind `Arc` so they can be registered
//! once and invoked concurrently from any worker thread. Each handler must
//! be reentrancy-safe with respect to whatever state it closes over; the
//! dispatcher makes no attempt to serialize calls to a given handler.

use std::sync::Arc;

use mcp_types::ContentItem;
use mcp_types::JsonRpcErrorCode;
use serde_json::Value;

use crate::server::McpServer;

/// A handler-level failure: a JSON-RPC error code plus an optional detail
/// message.
pub type HandlerError = (JsonRpcErrorCode, Option<String>);

/// Reads a static resource or resolves a URI-template binding into content.
pub type ResourceHandler = Arc<dyn Fn(&McpServer, &str) -> Result<Vec<ContentItem>, HandlerError> + Send + Sync>;

/// Outcome of a tool invocation: content items, the `isError` flag, and an
/// optional detail message.
pub type ToolOutcome = (Vec<ContentItem>, bool, Option<String>);

/// Executes a named tool against parsed arguments.
pub type ToolHandler = Arc<dyn Fn(&McpServer, &str, &Value) -> Result<ToolOutcome, HandlerError> + Send + Sync>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::server::McpServerBuilder;

    #[test]
    fn resource_handler_closure_coerces_to_the_expected_type() {
        let handler: ResourceHandler = Arc::new(|_server, uri| Ok(vec![ContentItem::text(uri.to_string())]));
        let server = McpServerBuilder::new().build().expect("build");
        let result = handler(&server, "ex://greet").expect("handler");
        assert_eq!(result[0].as_text(), Some("ex://greet"));
    }

    #[test]
    fn tool_handler_closure_coerces_to_the_expected_type() {
        let handler: ToolHandler = Arc::new(|_server, name, _args| Ok((vec![ContentItem::text(name.to_string())], false, None)));
        let server = McpServerBuilder::new().build().expect("build");
        let (content, is_error, message) = handler(&server, "greet", &Value::Null).expect("handler");
        assert_eq!(content[0].as_text(), Some("greet"));
        assert!(!is_error);
        assert!(message.is_none());
    }
}

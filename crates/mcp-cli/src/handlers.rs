// crates/mcp-cli/src/handlers.rs
// ============================================================================
// Module: Sample Handlers
// Description: A small set of example resources/tools registered at start-up
//              so the server is immediately useful without embedder code.
// ============================================================================

use std::sync::Arc;

use mcp_server::ResourceHandler;
use mcp_server::ToolHandler;
use mcp_types::ContentItem;
use mcp_types::JsonRpcErrorCode;
use mcp_types::Resource;
use mcp_types::ResourceTemplate;
use mcp_types::Tool;
use mcp_types::ToolParameter;
use serde_json::Value;

/// Static greeting resource, `ex://greet`.
#[must_use]
pub fn greet_resource() -> Resource {
    Resource::new("ex://greet", "greet").with_description("A static greeting".to_string())
}

#[must_use]
pub fn greet_handler() -> ResourceHandler {
    Arc::new(|_server, _uri| Ok(vec![ContentItem::text("Hello from mcp-server!".to_string())]))
}

/// Per-user greeting template, `ex://user/{name}`. The handler interface
/// hands back only the raw URI, so the bound `{name}` segment is recovered
/// from the tail of the path rather than passed in structured.
#[must_use]
pub fn user_template() -> ResourceTemplate {
    ResourceTemplate::new("ex://user/{name}", "user").with_description("Per-user greeting".to_string())
}

#[must_use]
pub fn user_handler() -> ResourceHandler {
    Arc::new(|_server, uri| {
        let name = uri.rsplit('/').next().filter(|segment| !segment.is_empty()).unwrap_or("stranger");
        Ok(vec![ContentItem::text(format!("Hello, {name}!"))])
    })
}

/// `echo` tool: returns its `text` argument verbatim.
#[must_use]
pub fn echo_tool() -> Tool {
    Tool::new("echo")
        .with_description("Echoes the `text` argument back as content".to_string())
        .with_parameter(ToolParameter::new("text", "string", true))
}

#[must_use]
pub fn echo_handler() -> ToolHandler {
    Arc::new(|_server, _name, arguments| {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or((JsonRpcErrorCode::InvalidParams, Some("arguments.text must be a string".to_string())))?;
        Ok((vec![ContentItem::text(text.to_string())], false, None))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn user_handler_extracts_trailing_path_segment() {
        let handler = user_handler();
        let server = mcp_server::McpServerBuilder::new().build().expect("build");
        let content = handler(&server, "ex://user/ada").expect("call");
        assert_eq!(content[0].as_text(), Some("Hello, ada!"));
    }

    #[test]
    fn echo_handler_returns_argument_verbatim() {
        let handler = echo_handler();
        let server = mcp_server::McpServerBuilder::new().build().expect("build");
        let (content, is_error, _) = handler(&server, "echo", &json!({ "text": "hi" })).expect("call");
        assert_eq!(content[0].as_text(), Some("hi"));
        assert!(!is_error);
    }

    #[test]
    fn echo_handler_rejects_missing_argument() {
        let handler = echo_handler();
        let server = mcp_server::McpServerBuilder::new().build().expect("build");
        let err = handler(&server, "echo", &json!({})).unwrap_err();
        assert_eq!(err.0, JsonRpcErrorCode::InvalidParams);
    }
}

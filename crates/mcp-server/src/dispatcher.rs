// crates/mcp-server/src/dispatcher.rs
// ============================================================================
// Module: JSON-RPC Dispatcher
// Description: Parses, authorizes, routes, and responds to one request.
// ============================================================================

//! ## Overview
//! [`dispatch_request`] is the pure, synchronous heart of request handling:
//! parse, validate shape, rate limit, authenticate, consult the gateway
//! overlay, dispatch by method, wrap the result. [`Dispatcher`] wraps it
//! with a worker pool so every call actually runs on a worker thread, and
//! exposes the result as a transport-facing
//! [`MessageCallback`](mcp_transport::MessageCallback).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use std::time::Instant;

use mcp_core::RateLimitDecision;
use mcp_core::WorkerPool;
use mcp_core::WorkerPoolConfig;
use mcp_gateway::GatewayRequest;
use mcp_gateway::forward_to_backend;
use mcp_types::ContentItem;
use mcp_types::JsonRpcErrorCode;
use mcp_types::RequestEnvelope;
use mcp_types::ResponseEnvelope;
use mcp_types::RpcError;
use serde_json::Value;
use serde_json::json;

use crate::audit::McpAuditEvent;
use crate::audit::McpAuditEventParams;
use crate::auth::RequestContext;
use crate::handlers::HandlerError;
use crate::server::McpServer;
use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpOutcome;

/// Bound on how long a gateway forward waits to acquire a backend
/// connection before giving up and reporting the backend down.
const GATEWAY_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
/// Bound on how long a gateway forward waits for the backend's framed reply.
const GATEWAY_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatches one raw JSON-RPC request and returns the raw response bytes,
/// or `None` when the request was a notification (no response expected).
#[must_use]
pub fn dispatch_request(server: &McpServer, client: &RequestContext, transport: &'static str, request_bytes: &[u8]) -> Option<Vec<u8>> {
    let request: RequestEnvelope = match serde_json::from_slice(request_bytes) {
        Ok(request) => request,
        Err(_) => {
            let response = ResponseEnvelope::failure(Value::Null, RpcError::from_code(JsonRpcErrorCode::ParseError));
            return Some(encode(&response));
        }
    };

    if request.jsonrpc != "2.0" || request.method.trim().is_empty() {
        return finish(
            server,
            client,
            transport,
            &request,
            request_bytes.len(),
            Err((JsonRpcErrorCode::InvalidRequest, None)),
        );
    }

    if server.rate_limiter.check(&client.client_key) == RateLimitDecision::Denied {
        return finish(
            server,
            client,
            transport,
            &request,
            request_bytes.len(),
            Err((JsonRpcErrorCode::RateLimited, None)),
        );
    }

    if !server.authenticator.authenticate(client) {
        return finish(
            server,
            client,
            transport,
            &request,
            request_bytes.len(),
            Err((JsonRpcErrorCode::Unauthorised, None)),
        );
    }

    if let Some(gateway_result) = try_gateway_overlay(server, &request, request_bytes) {
        return match gateway_result {
            Ok(reply_bytes) => {
                if request.is_notification() {
                    None
                } else {
                    Some(reply_bytes)
                }
            }
            Err(code) => finish(server, client, transport, &request, request_bytes.len(), Err((code, None))),
        };
    }

    let result = dispatch_by_method(server, &request);
    finish(server, client, transport, &request, request_bytes.len(), result)
}

fn dispatch_by_method(server: &McpServer, request: &RequestEnvelope) -> Result<Value, HandlerError> {
    match McpMethod::classify(&request.method) {
        McpMethod::Ping => Ok(json!({ "message": "pong" })),
        McpMethod::ListResources => Ok(json!({ "resources": server.registry.list_resources() })),
        McpMethod::ListResourceTemplates => Ok(json!({ "resourceTemplates": server.registry.list_templates() })),
        McpMethod::ReadResource => handle_read_resource(server, request.params.as_ref()),
        McpMethod::ListTools => Ok(json!({ "tools": server.registry.list_tools() })),
        McpMethod::CallTool => handle_call_tool(server, request.params.as_ref()),
        McpMethod::Invalid | McpMethod::Other => Err((JsonRpcErrorCode::MethodNotFound, None)),
    }
}

fn handle_read_resource(server: &McpServer, params: Option<&Value>) -> Result<Value, HandlerError> {
    let uri = params
        .and_then(|params| params.get("uri"))
        .and_then(Value::as_str)
        .ok_or((JsonRpcErrorCode::InvalidParams, Some("params.uri must be a string".to_string())))?;

    if let Some(items) = server.cache.lookup(uri) {
        return Ok(wrap_content(items));
    }

    let Some((handler, _variables)) = server.resolve_resource_handler(uri) else {
        return Err((JsonRpcErrorCode::ResourceNotFound, None));
    };

    let uri_owned = uri.to_string();
    match server.cache.fetch_or_insert(uri, None, || invoke_resource_handler(&handler, server, &uri_owned)) {
        Ok(items) => Ok(wrap_content(items)),
        Err(mcp_core::CacheError::Producer(err)) => Err(err),
    }
}

fn handle_call_tool(server: &McpServer, params: Option<&Value>) -> Result<Value, HandlerError> {
    let name = params
        .and_then(|params| params.get("name"))
        .and_then(Value::as_str)
        .ok_or((JsonRpcErrorCode::InvalidParams, Some("params.name must be a string".to_string())))?;
    let arguments = params.and_then(|params| params.get("arguments")).cloned().unwrap_or_else(|| json!({}));

    let Some(handler) = server.resolve_tool_handler(name) else {
        return Err((JsonRpcErrorCode::ToolNotFound, None));
    };

    let (content, is_error, message) = invoke_tool_handler(&handler, server, name, &arguments)?;
    let mut wrapped = json!({ "content": content, "isError": is_error });
    if let Some(message) = message {
        if let Some(object) = wrapped.as_object_mut() {
            object.insert("message".to_string(), Value::String(message));
        }
    }
    Ok(wrapped)
}

fn invoke_resource_handler(handler: &crate::handlers::ResourceHandler, server: &McpServer, uri: &str) -> Result<Vec<ContentItem>, HandlerError> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| handler(server, uri))) {
        Ok(result) => result,
        Err(_) => Err((JsonRpcErrorCode::InternalError, Some("resource handler panicked".to_string()))),
    }
}

fn invoke_tool_handler(
    handler: &crate::handlers::ToolHandler,
    server: &McpServer,
    name: &str,
    arguments: &Value,
) -> Result<crate::handlers::ToolOutcome, HandlerError> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| handler(server, name, arguments))) {
        Ok(result) => result,
        Err(_) => Err((JsonRpcErrorCode::InternalError, Some("tool handler panicked".to_string()))),
    }
}

fn wrap_content(items: Vec<ContentItem>) -> Value {
    json!({ "content": items })
}

/// Consults the gateway overlay, if one is configured. Returns `None` when
/// there is no gateway, the method isn't proxyable, or no backend claims
/// the request (meaning: fall through to local dispatch).
fn try_gateway_overlay(server: &McpServer, request: &RequestEnvelope, request_bytes: &[u8]) -> Option<Result<Vec<u8>, JsonRpcErrorCode>> {
    let gateway = server.gateway.as_ref()?;
    let gateway_request = match request.method.as_str() {
        "call_tool" => GatewayRequest::CallTool {
            name: request.params.as_ref()?.get("name")?.as_str()?,
        },
        "read_resource" => GatewayRequest::ReadResource {
            uri: request.params.as_ref()?.get("uri")?.as_str()?,
        },
        _ => return None,
    };
    let backend = gateway.resolve(&gateway_request)?;
    let deadline = Instant::now() + GATEWAY_ACQUIRE_TIMEOUT;
    match forward_to_backend(backend, request_bytes, mcp_framing::DEFAULT_MAX_FRAME_BYTES, deadline, GATEWAY_READ_TIMEOUT) {
        Ok(reply_bytes) => Some(Ok(reply_bytes)),
        Err(_) => Some(Err(JsonRpcErrorCode::GatewayBackendDown)),
    }
}

fn finish(
    server: &McpServer,
    client: &RequestContext,
    transport: &'static str,
    request: &RequestEnvelope,
    request_bytes: usize,
    result: Result<Value, HandlerError>,
) -> Option<Vec<u8>> {
    let method = McpMethod::classify(&request.method);
    let tool_name = result_tool_name(request, method);
    let (response, outcome, error_code) = match result {
        Ok(value) => (ResponseEnvelope::success(request.response_id(), value), McpOutcome::Ok, None),
        Err((code, message)) => {
            let error = message.map_or_else(|| RpcError::from_code(code), |message| RpcError::with_message(code, message));
            let error = error.with_data(json!({ "kind": code.kind(), "retryable": code.retryable() }));
            (ResponseEnvelope::failure(request.response_id(), error), McpOutcome::Error, Some(code.code()))
        }
    };

    let encoded = encode(&response);
    server.metrics.record_request(McpMetricEvent {
        transport,
        method,
        tool: tool_name.clone(),
        outcome,
        error_code,
        request_bytes,
        response_bytes: encoded.len(),
    });
    server.audit.record(&McpAuditEvent::new(McpAuditEventParams {
        transport,
        peer: Some(client.client_key.clone()),
        method,
        tool: tool_name,
        outcome,
        error_code,
        request_bytes,
        response_bytes: encoded.len(),
    }));

    if request.is_notification() {
        None
    } else {
        Some(encoded)
    }
}

fn result_tool_name(request: &RequestEnvelope, method: McpMethod) -> Option<String> {
    if method != McpMethod::CallTool {
        return None;
    }
    request.params.as_ref()?.get("name")?.as_str().map(ToString::to_string)
}

fn encode(response: &ResponseEnvelope) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|_| {
        br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"internal error"}}"#.to_vec()
    })
}

/// A queued unit of work: one request's bytes, its client context, and a
/// channel to deliver the response bytes back to the waiting transport.
struct DispatchTask {
    client: RequestContext,
    request_bytes: Vec<u8>,
    respond: mpsc::SyncSender<Option<Vec<u8>>>,
}

/// Wraps an [`McpServer`] with a worker pool, turning synchronous dispatch
/// into a transport-facing message callback. Every request actually runs
/// on a worker thread, matching the dispatcher's execution contract; queue
/// overflow surfaces to the caller as `InternalError` ("server overloaded")
/// rather than blocking the transport thread indefinitely.
pub struct Dispatcher {
    server: Arc<McpServer>,
    pool: WorkerPool<DispatchTask>,
    transport: &'static str,
}

impl Dispatcher {
    /// Starts the worker pool bound to `server`. `transport` labels every
    /// metric/audit event this dispatcher instance produces.
    #[must_use]
    pub fn start(server: Arc<McpServer>, pool_config: WorkerPoolConfig, transport: &'static str) -> Self {
        let worker_server = Arc::clone(&server);
        let pool = WorkerPool::start(pool_config, move |task: DispatchTask| {
            let reply = dispatch_request(&worker_server, &task.client, transport, &task.request_bytes);
            let _ = task.respond.send(reply);
        });
        Self { server, pool, transport }
    }

    /// Dispatches one request synchronously by submitting it to the pool
    /// and blocking for the reply. Queue-full is translated into a
    /// JSON-RPC `InternalError` response rather than propagated as a
    /// transport failure.
    #[must_use]
    pub fn dispatch(&self, client_key: String, token: Option<String>, request_bytes: Vec<u8>) -> Option<Vec<u8>> {
        let (respond, receiver) = mpsc::sync_channel(1);
        let task = DispatchTask {
            client: RequestContext::new(client_key, token),
            request_bytes,
            respond,
        };
        if self.pool.submit(task).is_err() {
            return Some(overloaded_response());
        }
        receiver.recv().unwrap_or(None)
    }

    /// Builds a [`mcp_transport::MessageCallback`] backed by this
    /// dispatcher. The transport's [`mcp_transport::ClientId`] supplies both
    /// the rate-limit/audit key and the bearer token, so `--api-key`/
    /// `auth.bearer_tokens` is enforced against whatever the transport
    /// actually received.
    #[must_use]
    pub fn message_callback(self: &Arc<Self>) -> mcp_transport::MessageCallback {
        let dispatcher = Arc::clone(self);
        Arc::new(move |client_id: mcp_transport::ClientId, bytes: Vec<u8>| dispatcher.dispatch(client_id.key, client_id.token, bytes))
    }

    /// Returns the underlying server, e.g. to shut down the gateway.
    #[must_use]
    pub fn server(&self) -> &Arc<McpServer> {
        &self.server
    }

    /// Stops accepting new requests and shuts down the worker pool,
    /// draining up to `graceful_shutdown` before cancelling the rest.
    pub fn shutdown(self, graceful_shutdown: Duration) {
        self.pool.shutdown(graceful_shutdown);
        if let Some(gateway) = &self.server.gateway {
            gateway.shutdown();
        }
        let _ = self.transport;
    }
}

fn overloaded_response() -> Vec<u8> {
    let code = JsonRpcErrorCode::InternalError;
    let error = RpcError::with_message(code, "server overloaded")
        .with_data(json!({ "kind": code.kind(), "retryable": code.retryable() }));
    let response = ResponseEnvelope::failure(Value::Null, error);
    encode(&response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::Arc;

    use mcp_types::Resource;
    use mcp_types::Tool;

    use super::*;
    use crate::server::McpServerBuilder;

    fn client(key: &str) -> RequestContext {
        RequestContext::new(key.to_string(), None)
    }

    #[test]
    fn ping_returns_pong() {
        let server = McpServerBuilder::new().build().expect("build");
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let reply = dispatch_request(&server, &client("c1"), "stdio", bytes).expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["result"]["message"], "pong");
    }

    #[test]
    fn malformed_json_yields_parse_error_with_null_id() {
        let server = McpServerBuilder::new().build().expect("build");
        let reply = dispatch_request(&server, &client("c1"), "stdio", b"not json").expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], Value::Null);
    }

    #[test]
    fn notification_produces_no_response() {
        let server = McpServerBuilder::new().build().expect("build");
        let bytes = br#"{"jsonrpc":"2.0","method":"ping"}"#;
        assert!(dispatch_request(&server, &client("c1"), "stdio", bytes).is_none());
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let server = McpServerBuilder::new().build().expect("build");
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"bogus"}"#;
        let reply = dispatch_request(&server, &client("c1"), "stdio", bytes).expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["data"]["kind"], "method_not_found");
        assert_eq!(response["error"]["data"]["retryable"], false);
    }

    #[test]
    fn read_resource_serves_cache_hit_without_calling_handler_again() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let handler: crate::handlers::ResourceHandler = Arc::new(move |_s, uri| {
            calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(vec![ContentItem::text(uri.to_string())])
        });
        let server = McpServerBuilder::new()
            .register_resource(Resource::new("ex://greet", "greet"), handler)
            .expect("register")
            .build()
            .expect("build");

        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"read_resource","params":{"uri":"ex://greet"}}"#;
        dispatch_request(&server, &client("c1"), "stdio", bytes).expect("first reply");
        dispatch_request(&server, &client("c1"), "stdio", bytes).expect("second reply");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn read_resource_missing_uri_is_resource_not_found() {
        let server = McpServerBuilder::new().build().expect("build");
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"read_resource","params":{"uri":"ex://missing"}}"#;
        let reply = dispatch_request(&server, &client("c1"), "stdio", bytes).expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["error"]["code"], -32001);
    }

    #[test]
    fn call_tool_wraps_content_and_is_error_flag() {
        let handler: crate::handlers::ToolHandler = Arc::new(|_s, name, _args| Ok((vec![ContentItem::text(name.to_string())], false, None)));
        let server = McpServerBuilder::new()
            .register_tool(Tool::new("greet"), handler)
            .expect("register")
            .build()
            .expect("build");

        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"call_tool","params":{"name":"greet","arguments":{}}}"#;
        let reply = dispatch_request(&server, &client("c1"), "stdio", bytes).expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["result"]["content"][0]["data"], json!([103, 114, 101, 101, 116]));
        assert_eq!(response["result"]["isError"], false);
    }

    #[test]
    fn panicking_tool_handler_yields_internal_error_not_a_crash() {
        let handler: crate::handlers::ToolHandler = Arc::new(|_s, _n, _a| panic!("boom"));
        let server = McpServerBuilder::new()
            .register_tool(Tool::new("boom"), handler)
            .expect("register")
            .build()
            .expect("build");

        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"call_tool","params":{"name":"boom","arguments":{}}}"#;
        let reply = dispatch_request(&server, &client("c1"), "stdio", bytes).expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["error"]["code"], -32603);
    }

    #[test]
    fn rate_limited_client_gets_rate_limited_error() {
        let mut config = crate::config::ServerConfig::default();
        config.rate_limit.max_requests = 1;
        let server = McpServerBuilder::new().with_config(config).build().expect("build");
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        dispatch_request(&server, &client("limited"), "stdio", bytes).expect("first allowed");
        let reply = dispatch_request(&server, &client("limited"), "stdio", bytes).expect("second reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["error"]["code"], -32004);
        assert_eq!(response["error"]["data"]["retryable"], true);
    }

    #[test]
    fn unauthenticated_request_is_rejected_when_tokens_are_configured() {
        let mut config = crate::config::ServerConfig::default();
        config.auth.bearer_tokens = vec!["secret".to_string()];
        let server = McpServerBuilder::new().with_config(config).build().expect("build");
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let reply = dispatch_request(&server, &client("c1"), "stdio", bytes).expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["error"]["code"], -32003);
    }

    #[test]
    fn dispatcher_round_trips_a_request_through_the_worker_pool() {
        let server = Arc::new(McpServerBuilder::new().build().expect("build"));
        let dispatcher = Dispatcher::start(server, WorkerPoolConfig::default(), "tcp");
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_vec();
        let reply = dispatcher.dispatch("c1".to_string(), None, bytes).expect("reply");
        let response: Value = serde_json::from_slice(&reply).expect("parse");
        assert_eq!(response["result"]["message"], "pong");
        dispatcher.shutdown(Duration::from_millis(100));
    }

    #[test]
    fn dispatcher_forwards_client_id_token_to_the_authenticator() {
        let mut config = crate::config::ServerConfig::default();
        config.auth.bearer_tokens = vec!["secret".to_string()];
        let server = Arc::new(McpServerBuilder::new().with_config(config).build().expect("build"));
        let dispatcher = Dispatcher::start(server, WorkerPoolConfig::default(), "http");
        let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_vec();

        let rejected = dispatcher.dispatch("secret".to_string(), None, bytes.clone()).expect("reply");
        let rejected: Value = serde_json::from_slice(&rejected).expect("parse");
        assert_eq!(rejected["error"]["code"], -32003);

        let accepted = dispatcher.dispatch("secret".to_string(), Some("secret".to_string()), bytes).expect("reply");
        let accepted: Value = serde_json::from_slice(&accepted).expect("parse");
        assert_eq!(accepted["result"]["message"], "pong");
        dispatcher.shutdown(Duration::from_millis(100));
    }
}

// crates/mcp-server/tests/end_to_end.rs
// ============================================================================
// Integration tests exercising the full dispatch pipeline against real
// handlers, a real rate limiter, and a real gateway backend.
// ============================================================================
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Read;
use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use mcp_framing::write_frame;
use mcp_gateway::BackendDescriptor;
use mcp_gateway::BackendRouting;
use mcp_gateway::GatewayRouter;
use mcp_gateway::PoolConfig;
use mcp_server::McpServerBuilder;
use mcp_server::RequestContext;
use mcp_server::ServerConfig;
use mcp_server::dispatch_request;
use mcp_types::ContentItem;
use mcp_types::ResourceTemplate;
use serde_json::Value;

fn client(key: &str) -> RequestContext {
    RequestContext::new(key.to_string(), None)
}

/// Scenario: a template resource `ex://user/{name}` binds `name` and the
/// handler's reply reflects it, even though the handler only ever sees the
/// raw URI string.
#[test]
fn template_binding_produces_a_personalised_greeting() {
    let handler: mcp_server::ResourceHandler = Arc::new(|_server, uri| {
        let name = uri.rsplit('/').next().unwrap_or("stranger");
        Ok(vec![ContentItem::text(format!("Hello, {name}!"))])
    });
    let server = McpServerBuilder::new()
        .register_template(ResourceTemplate::new("ex://user/{name}", "user"), handler)
        .expect("register template")
        .build()
        .expect("build");

    let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"read_resource","params":{"uri":"ex://user/ada"}}"#;
    let reply = dispatch_request(&server, &client("c1"), "stdio", bytes).expect("reply");
    let response: Value = serde_json::from_slice(&reply).expect("parse");
    assert_eq!(response["result"]["content"][0]["data"], serde_json::json!(b"Hello, ada!".to_vec()));
}

/// Scenario: capacity=1024, window=1s, max_requests=2 — three pings from
/// the same client key yield two successes then a rate-limited error.
#[test]
fn rate_limiter_admits_exactly_max_requests_per_window() {
    let mut config = ServerConfig::default();
    config.rate_limit.capacity = 1024;
    config.rate_limit.window_seconds = 1;
    config.rate_limit.max_requests = 2;
    let server = McpServerBuilder::new().with_config(config).build().expect("build");

    let bytes = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
    let first = dispatch_request(&server, &client("steady"), "stdio", bytes).expect("first");
    let second = dispatch_request(&server, &client("steady"), "stdio", bytes).expect("second");
    let third = dispatch_request(&server, &client("steady"), "stdio", bytes).expect("third");

    let first: Value = serde_json::from_slice(&first).expect("parse");
    let second: Value = serde_json::from_slice(&second).expect("parse");
    let third: Value = serde_json::from_slice(&third).expect("parse");
    assert_eq!(first["result"]["message"], "pong");
    assert_eq!(second["result"]["message"], "pong");
    assert_eq!(third["error"]["code"], -32004);
}

/// Scenario: a gateway backend registered for the `echo` tool receives the
/// request verbatim and its reply (including the original id) is forwarded
/// back unchanged.
#[test]
fn gateway_forwards_call_tool_to_matching_backend_verbatim() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr").to_string();
    let backend_thread = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        echo_one_frame(&mut stream);
    });

    let descriptor = BackendDescriptor {
        name: "b1".to_string(),
        address: addr,
        routing: BackendRouting {
            tool_names: vec!["echo".to_string()],
            resource_prefixes: Vec::new(),
            resource_templates: Vec::new(),
        },
    };
    let gateway = GatewayRouter::from_descriptors(vec![descriptor], PoolConfig::default());
    let server = McpServerBuilder::new().with_gateway(gateway).build().expect("build");

    let bytes = br#"{"jsonrpc":"2.0","id":"req-9","method":"call_tool","params":{"name":"echo","arguments":{}}}"#;
    let reply = dispatch_request(&server, &client("c1"), "tcp", bytes).expect("reply");
    assert_eq!(reply, bytes);

    backend_thread.join().expect("backend thread");
}

fn echo_one_frame(stream: &mut TcpStream) {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).expect("read header");
    let len = u32::from_be_bytes(header) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).expect("read payload");
    write_frame(stream, &payload).expect("reply");
}

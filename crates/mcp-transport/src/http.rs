// crates/mcp-transport/src/http.rs
// ============================================================================
// Module: HTTP Transport
// Description: axum-based `POST /call_tool` + `GET /events` SSE endpoints.
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::sse::Event;
use axum::response::sse::Sse;
use axum::routing::get;
use axum::routing::post;
use bytes::Bytes;
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::callback::ClientId;
use crate::callback::MessageCallback;
use crate::sse::SessionFilter;
use crate::sse::SseChannel;

/// CORS policy applied to every response.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Whether CORS headers are emitted at all.
    pub enabled: bool,
    /// `Access-Control-Allow-Origin` value.
    pub allow_origin: String,
    /// `Access-Control-Allow-Credentials` value.
    pub allow_credentials: bool,
}

/// HTTP transport configuration.
#[derive(Clone)]
pub struct HttpTransportConfig {
    /// Maximum accepted JSON-RPC request body size, in bytes.
    pub max_body_bytes: usize,
    /// Token clients present to derive the rate-limit key; `None` falls
    /// back to the peer address.
    pub bearer_token_header: &'static str,
    /// CORS policy.
    pub cors: CorsConfig,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: mcp_framing::DEFAULT_MAX_FRAME_BYTES,
            bearer_token_header: "authorization",
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    callback: MessageCallback,
    config: HttpTransportConfig,
    sse: Arc<SseChannel>,
}

/// Builds the axum [`Router`] serving `POST /call_tool` and `GET /events`.
/// Paths outside this set return 404; document-root static serving is an
/// external collaborator's responsibility, not implemented here.
#[must_use]
pub fn router(callback: MessageCallback, config: HttpTransportConfig, sse: Arc<SseChannel>) -> Router {
    spawn_heartbeat_loop(Arc::clone(&sse));
    let state = AppState { callback, config, sse };
    Router::new()
        .route("/call_tool", post(handle_call_tool).options(handle_options))
        .route("/events", get(handle_events).options(handle_options))
        .fallback(handle_not_found)
        .with_state(state)
}

/// Calls [`SseChannel::heartbeat`] every 30 seconds for the lifetime of the
/// process. This replaces axum's built-in `KeepAlive`, so the channel owns
/// its own heartbeat state instead of delegating it to the framework.
fn spawn_heartbeat_loop(sse: Arc<SseChannel>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            ticker.tick().await;
            sse.heartbeat();
        }
    });
}

async fn handle_options(State(state): State<AppState>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_cors(&state.config.cors, &mut response);
    response
}

async fn handle_not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

async fn handle_call_tool(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return method_not_allowed(&state.config.cors);
    }
    if body.len() > state.config.max_body_bytes {
        let mut response = StatusCode::BAD_REQUEST.into_response();
        apply_cors(&state.config.cors, &mut response);
        return response;
    }
    let client_id = derive_client_id(&headers, peer, state.config.bearer_token_header);
    let reply = (state.callback)(client_id, body.to_vec());
    let mut response = match reply {
        Some(bytes) => (StatusCode::OK, bytes).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    apply_cors(&state.config.cors, &mut response);
    response
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    #[serde(rename = "lastEventId")]
    last_event_id: Option<u64>,
    filter: Option<String>,
    session_id: Option<String>,
}

async fn handle_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let filter = SessionFilter {
        event_type: query.filter.clone(),
        session_id: query.session_id.clone(),
    };
    let replay: Vec<String> = match query.last_event_id {
        Some(last_event_id) => state.sse.replay_since(last_event_id, query.filter.as_deref()),
        None => Vec::new(),
    };
    let receiver = state.sse.subscribe(filter);
    let live = UnboundedReceiverStream::new(receiver).map(|wire| Ok(Event::default().data(wire)));
    let replayed = tokio_stream::iter(replay).map(|wire| Ok(Event::default().data(wire)));
    Sse::new(replayed.chain(live))
}

fn method_not_allowed(cors: &CorsConfig) -> Response {
    let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
    apply_cors(cors, &mut response);
    response
}

fn apply_cors(cors: &CorsConfig, response: &mut Response) {
    if !cors.enabled {
        return;
    }
    let headers = response.headers_mut();
    if let Ok(value) = cors.allow_origin.parse() {
        headers.insert("access-control-allow-origin", value);
    }
    if let Ok(value) = "GET, POST, OPTIONS".parse() {
        headers.insert("access-control-allow-methods", value);
    }
    if cors.allow_credentials {
        if let Ok(value) = "true".parse() {
            headers.insert("access-control-allow-credentials", value);
        }
    }
}

fn derive_client_id(headers: &HeaderMap, peer: SocketAddr, bearer_header: &str) -> ClientId {
    if let Some(value) = headers.get(bearer_header).and_then(|value| value.to_str().ok()) {
        let token = value.strip_prefix("Bearer ").unwrap_or(value).to_string();
        return ClientId::with_token(token.clone(), Some(token));
    }
    ClientId::new(peer.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::net::SocketAddr;

    use super::*;

    #[test]
    fn client_id_prefers_bearer_header_over_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc".parse().expect("header value"));
        let peer: SocketAddr = "127.0.0.1:9999".parse().expect("addr");
        let client_id = derive_client_id(&headers, peer, "authorization");
        assert_eq!(client_id.key, "abc");
        assert_eq!(client_id.token, Some("abc".to_string()));
    }

    #[test]
    fn client_id_falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "127.0.0.1:9999".parse().expect("addr");
        let client_id = derive_client_id(&headers, peer, "authorization");
        assert_eq!(client_id.key, "127.0.0.1:9999");
        assert_eq!(client_id.token, None);
    }

    #[test]
    fn client_id_strips_missing_bearer_prefix_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "raw-token".parse().expect("header value"));
        let peer: SocketAddr = "127.0.0.1:9999".parse().expect("addr");
        let client_id = derive_client_id(&headers, peer, "authorization");
        assert_eq!(client_id.key, "raw-token");
        assert_eq!(client_id.token, Some("raw-token".to_string()));
    }
}

// crates/mcp-transport/src/callback.rs
// ============================================================================
// Module: Message Callback
// Description: The shared contract transports use to hand payloads upward.
// ============================================================================

use std::sync::Arc;

/// Identifies the client a message arrived from or is destined to, as seen
/// by a single transport instance, along with any bearer token it presented.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId {
    /// Rate-limit/audit key: the bearer token if one was presented, else a
    /// transport-derived fallback (peer address, or `stdio` for the stdio
    /// transport).
    pub key: String,
    /// Bearer token presented with the message, if the transport has one to
    /// give (only HTTP does today).
    pub token: Option<String>,
}

impl ClientId {
    /// The constant client identifier used by the stdio transport, which has
    /// no peer address to key on.
    pub const STDIO: &'static str = "stdio";

    /// Builds a client id with no bearer token, keyed on `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), token: None }
    }

    /// Builds a client id keyed on `key`, carrying `token`.
    #[must_use]
    pub fn with_token(key: impl Into<String>, token: Option<String>) -> Self {
        Self { key: key.into(), token }
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_carries_no_token() {
        let client_id = ClientId::new("peer");
        assert_eq!(client_id.key, "peer");
        assert_eq!(client_id.token, None);
    }

    #[test]
    fn with_token_carries_the_given_token() {
        let client_id = ClientId::with_token("abc", Some("abc".to_string()));
        assert_eq!(client_id.key, "abc");
        assert_eq!(client_id.token, Some("abc".to_string()));
    }
}

/// The callback transports invoke for each complete inbound payload.
///
/// Returns `Some(bytes)` to send a response back on the same connection, or
/// `None` when the payload was a notification with nothing to reply with.
/// Must be thread-safe: transports may invoke it concurrently from several
/// connection-handling threads.
pub type MessageCallback = Arc<dyn Fn(ClientId, Vec<u8>) -> Option<Vec<u8>> + Send + Sync>;

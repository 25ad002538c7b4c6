// crates/mcp-server/src/auth.rs
// ============================================================================
// Module: MCP Auth
// Description: Opaque bearer-token authentication for inbound requests.
// ============================================================================

//! ## Overview
//! Authentication here is a single check: is the presented token one of the
//! configured accepted tokens? There is no session state, no token minting,
//! and no scoping by tool or resource; richer authorization schemes are an
//! external collaborator's responsibility.

/// Per-request context derived from the transport before dispatch.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Opaque client key used for rate limiting and audit logging.
    pub client_key: String,
    /// Bearer token presented with the request, if any.
    pub token: Option<String>,
}

impl RequestContext {
    /// Builds a context from a client key and an optional bearer token.
    #[must_use]
    pub fn new(client_key: String, token: Option<String>) -> Self {
        Self { client_key, token }
    }
}

/// Accepts or rejects requests against a fixed set of bearer tokens.
pub struct TokenAuthenticator {
    accepted_tokens: Vec<String>,
}

impl TokenAuthenticator {
    /// Builds an authenticator from the configured accepted tokens. An
    /// empty list means every request is authenticated, suitable for
    /// `stdio` and loopback-only deployments.
    #[must_use]
    pub fn new(accepted_tokens: Vec<String>) -> Self {
        Self { accepted_tokens }
    }

    /// Returns whether the request context is authenticated.
    #[must_use]
    pub fn authenticate(&self, context: &RequestContext) -> bool {
        if self.accepted_tokens.is_empty() {
            return true;
        }
        match &context.token {
            Some(token) => self.accepted_tokens.iter().any(|accepted| accepted == token),
            None => false,
        }
    }
}

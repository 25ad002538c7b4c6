// crates/mcp-types/src/error.rs
// ============================================================================
// Module: JSON-RPC Error Codes
// Description: The invariant set of error codes the dispatcher may emit.
// ============================================================================

/// The fixed set of JSON-RPC error codes this server may return.
///
/// # Invariants
/// - Numeric values are stable across versions; they are part of the wire
///   contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON sent is not a valid request object.
    InvalidRequest,
    /// The requested method does not exist.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Transport-level failure surfaced as a JSON-RPC error.
    TransportError,
    /// The requested resource URI does not resolve.
    ResourceNotFound,
    /// The requested tool name is not registered.
    ToolNotFound,
    /// The caller is not authorised for the requested method/target.
    Unauthorised,
    /// The caller exceeded its rate limit.
    RateLimited,
    /// A gateway backend could not be reached.
    GatewayBackendDown,
}

impl JsonRpcErrorCode {
    /// Returns the wire numeric code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::TransportError => -32000,
            Self::ResourceNotFound => -32001,
            Self::ToolNotFound => -32002,
            Self::Unauthorised => -32003,
            Self::RateLimited => -32004,
            Self::GatewayBackendDown => -32005,
        }
    }

    /// Returns a default, wire-stable message for the code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "parse error",
            Self::InvalidRequest => "invalid request",
            Self::MethodNotFound => "method not found",
            Self::InvalidParams => "invalid params",
            Self::InternalError => "internal error",
            Self::TransportError => "transport error",
            Self::ResourceNotFound => "resource not found",
            Self::ToolNotFound => "tool not found",
            Self::Unauthorised => "unauthorised",
            Self::RateLimited => "rate limited",
            Self::GatewayBackendDown => "gateway backend down",
        }
    }

    /// Returns a stable machine-readable label for this code, carried in the
    /// response's `error.data.kind` field.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::ParseError => "parse_error",
            Self::InvalidRequest => "invalid_request",
            Self::MethodNotFound => "method_not_found",
            Self::InvalidParams => "invalid_params",
            Self::InternalError => "internal_error",
            Self::TransportError => "transport_error",
            Self::ResourceNotFound => "resource_not_found",
            Self::ToolNotFound => "tool_not_found",
            Self::Unauthorised => "unauthorised",
            Self::RateLimited => "rate_limited",
            Self::GatewayBackendDown => "gateway_backend_down",
        }
    }

    /// Whether retrying the same request unchanged might reasonably
    /// succeed, carried in `error.data.retryable`.
    #[must_use]
    pub const fn retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::GatewayBackendDown | Self::InternalError)
    }

    /// Maps a wire code back to a variant, when recognised.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(Self::ParseError),
            -32600 => Some(Self::InvalidRequest),
            -32601 => Some(Self::MethodNotFound),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::InternalError),
            -32000 => Some(Self::TransportError),
            -32001 => Some(Self::ResourceNotFound),
            -32002 => Some(Self::ToolNotFound),
            -32003 => Some(Self::Unauthorised),
            -32004 => Some(Self::RateLimited),
            -32005 => Some(Self::GatewayBackendDown),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_from_code() {
        let codes = [
            JsonRpcErrorCode::ParseError,
            JsonRpcErrorCode::InvalidRequest,
            JsonRpcErrorCode::MethodNotFound,
            JsonRpcErrorCode::InvalidParams,
            JsonRpcErrorCode::InternalError,
            JsonRpcErrorCode::TransportError,
            JsonRpcErrorCode::ResourceNotFound,
            JsonRpcErrorCode::ToolNotFound,
            JsonRpcErrorCode::Unauthorised,
            JsonRpcErrorCode::RateLimited,
            JsonRpcErrorCode::GatewayBackendDown,
        ];
        for code in codes {
            assert_eq!(JsonRpcErrorCode::from_code(code.code()), Some(code));
        }
    }

    #[test]
    fn unknown_code_returns_none() {
        assert_eq!(JsonRpcErrorCode::from_code(-1), None);
    }

    #[test]
    fn rate_limited_and_gateway_down_are_retryable() {
        assert!(JsonRpcErrorCode::RateLimited.retryable());
        assert!(JsonRpcErrorCode::GatewayBackendDown.retryable());
        assert!(!JsonRpcErrorCode::InvalidParams.retryable());
    }

    #[test]
    fn kind_is_a_stable_snake_case_label() {
        assert_eq!(JsonRpcErrorCode::ToolNotFound.kind(), "tool_not_found");
        assert_eq!(JsonRpcErrorCode::RateLimited.kind(), "rate_limited");
    }
}

// crates/mcp-server/src/telemetry.rs
// ============================================================================
// Module: MCP Telemetry
// Description: Observability hooks for dispatcher request/latency events.
// Purpose: Provide metric events without a hard dependency on any backend.
// ============================================================================

//! ## Overview
//! A thin metrics interface so deployments can plug in Prometheus, StatsD,
//! or anything else without redesigning the dispatcher. The core crate has
//! no hard dependency on a logging or metrics framework; it only depends on
//! the [`McpMetrics`] trait.

use std::time::Duration;

/// Default latency buckets in milliseconds for request histograms.
pub const MCP_LATENCY_BUCKETS_MS: &[u64] = &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000];

/// JSON-RPC method classification used for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    /// `ping`.
    Ping,
    /// `list_resources`.
    ListResources,
    /// `list_resource_templates`.
    ListResourceTemplates,
    /// `read_resource`.
    ReadResource,
    /// `list_tools`.
    ListTools,
    /// `call_tool`.
    CallTool,
    /// Malformed or unparseable request.
    Invalid,
    /// A method name outside the known set.
    Other,
}

impl McpMethod {
    /// Returns a stable label for the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ListResources => "list_resources",
            Self::ListResourceTemplates => "list_resource_templates",
            Self::ReadResource => "read_resource",
            Self::ListTools => "list_tools",
            Self::CallTool => "call_tool",
            Self::Invalid => "invalid",
            Self::Other => "other",
        }
    }

    /// Classifies a raw method string.
    #[must_use]
    pub fn classify(method: &str) -> Self {
        match method {
            "ping" => Self::Ping,
            "list_resources" => Self::ListResources,
            "list_resource_templates" => Self::ListResourceTemplates,
            "read_resource" => Self::ReadResource,
            "list_tools" => Self::ListTools,
            "call_tool" => Self::CallTool,
            _ => Self::Other,
        }
    }
}

/// Request outcome classification used for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpOutcome {
    /// The request completed successfully.
    Ok,
    /// The request ended in a JSON-RPC error.
    Error,
}

impl McpOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// One request's worth of metric metadata.
#[derive(Debug, Clone)]
pub struct McpMetricEvent {
    /// Transport the request arrived on.
    pub transport: &'static str,
    /// Method classification.
    pub method: McpMethod,
    /// Tool name, when the method is `call_tool`.
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code, when the outcome is an error.
    pub error_code: Option<i64>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Metrics sink for dispatcher request and latency events.
pub trait McpMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: McpMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: McpMetricEvent, latency: Duration);
}

/// A metrics sink that discards every event.
pub struct NoopMetrics;

impl McpMetrics for NoopMetrics {
    fn record_request(&self, _event: McpMetricEvent) {}
    fn record_latency(&self, _event: McpMetricEvent, _latency: Duration) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognises_every_method_contract() {
        assert_eq!(McpMethod::classify("ping"), McpMethod::Ping);
        assert_eq!(McpMethod::classify("call_tool"), McpMethod::CallTool);
        assert_eq!(McpMethod::classify("bogus"), McpMethod::Other);
    }

    #[test]
    fn noop_metrics_accepts_every_event_without_panicking() {
        let metrics = NoopMetrics;
        let event = McpMetricEvent {
            transport: "stdio",
            method: McpMethod::Ping,
            tool: None,
            outcome: McpOutcome::Ok,
            error_code: None,
            request_bytes: 10,
            response_bytes: 20,
        };
        metrics.record_request(event.clone());
        metrics.record_latency(event, Duration::from_millis(1));
    }
}

// crates/mcp-server/src/audit.rs
// ============================================================================
// Module: MCP Audit
// Description: Structured audit log records for every dispatched request.
// ============================================================================

//! ## Overview
//! One audit record per request, written through a pluggable sink. The
//! default sink is a no-op; deployments wire in [`StderrAuditSink`] or
//! [`FileAuditSink`] as needed. Audit output never blocks dispatch on a
//! remote system: every sink here is local (stderr or an append-only file).

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::telemetry::McpMethod;
use crate::telemetry::McpOutcome;

/// Parameters used to build a [`McpAuditEvent`].
#[derive(Debug, Clone)]
pub struct McpAuditEventParams {
    /// Transport the request arrived on.
    pub transport: &'static str,
    /// Peer address or bearer-derived client key, when known.
    pub peer: Option<String>,
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

/// A single structured audit record.
#[derive(Debug, Clone, Serialize)]
pub struct McpAuditEvent {
    /// Fixed discriminator for downstream log routing.
    pub event: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u128,
    /// Transport the request arrived on.
    pub transport: &'static str,
    /// Peer address or bearer-derived client key, when known.
    pub peer: Option<String>,
    /// Method label.
    pub method: &'static str,
    /// Tool name, when the method is `call_tool`.
    pub tool: Option<String>,
    /// Outcome label.
    pub outcome: &'static str,
    /// JSON-RPC error code, when the outcome is an error.
    pub error_code: Option<i64>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

impl McpAuditEvent {
    /// Builds an event stamped with the current wall-clock time.
    #[must_use]
    pub fn new(params: McpAuditEventParams) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self {
            event: "mcp_request",
            timestamp_ms,
            transport: params.transport,
            peer: params.peer,
            method: params.method.as_str(),
            tool: params.tool,
            outcome: params.outcome.as_str(),
            error_code: params.error_code,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
        }
    }
}

/// Sink every dispatched request's audit record is written through.
pub trait McpAuditSink: Send + Sync {
    /// Records a single audit event.
    fn record(&self, event: &McpAuditEvent);
}

/// Discards every audit event.
pub struct NoopAuditSink;

impl McpAuditSink for NoopAuditSink {
    fn record(&self, _event: &McpAuditEvent) {}
}

/// Writes one JSON line per audit event to stderr.
pub struct StderrAuditSink;

impl McpAuditSink for StderrAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Writes one JSON line per audit event to an append-only file.
pub struct FileAuditSink {
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens `path` for appending, creating it if necessary.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened for appending.
    pub fn new(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl McpAuditSink for FileAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            if let Ok(mut file) = self.file.lock() {
                if writeln!(file, "{payload}").is_ok() {
                    let _ = file.flush();
                }
            }
        }
    }
}

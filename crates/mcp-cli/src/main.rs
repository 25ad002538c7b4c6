// crates/mcp-cli/src/main.rs
// ============================================================================
// Module: MCP Server CLI Entry Point
// Description: Parses CLI flags, wires handlers, and runs one transport.
// Purpose: The host process an operator actually invokes to run an MCP
//          server: pick a transport, bind it, register sample handlers,
//          serve until shutdown.
// Dependencies: axum, clap, mcp-core, mcp-gateway, mcp-server,
//               mcp-transport, mcp-types, tokio
// ============================================================================

//! ## Overview
//! This binary is a thin composition root: parse flags into a
//! [`mcp_server::ServerConfig`], register a small set of example resources
//! and tools, optionally load a gateway configuration, start a
//! [`mcp_server::Dispatcher`], and hand it to the selected transport. It
//! owns no protocol logic of its own.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::ValueEnum;
use mcp_gateway::GatewayRouter;
use mcp_gateway::PoolConfig;
use mcp_server::BuildError;
use mcp_server::ConfigError;
use mcp_server::Dispatcher;
use mcp_server::FileAuditSink;
use mcp_server::McpAuditEvent;
use mcp_server::McpAuditSink;
use mcp_server::McpOutcome;
use mcp_server::McpServerBuilder;
use mcp_server::ServerConfig;
use mcp_server::StderrAuditSink;
use mcp_transport::HttpTransportConfig;
use mcp_transport::SseChannel;
use mcp_transport::StdioTransport;
use mcp_transport::TcpTransport;
use mcp_transport::TcpTransportConfig;
use mcp_transport::TcpTransportError;
use thiserror::Error;

mod handlers;
mod staticfiles;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Transport selection accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, Default)]
#[value(rename_all = "lowercase")]
enum TransportArg {
    /// Length-prefixed frames over stdin/stdout.
    #[default]
    Stdio,
    /// Length-prefixed frames over a TCP socket.
    Tcp,
    /// JSON-RPC over HTTP with SSE notifications.
    Http,
}

/// Minimum audit outcome an event must carry to be recorded.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[value(rename_all = "lowercase")]
enum LogLevel {
    /// Record only requests that ended in a JSON-RPC error.
    Error,
    /// Record every request (the default).
    Info,
}

/// Starts an MCP server over stdio, TCP, or HTTP.
#[derive(Parser, Debug)]
#[command(name = "mcp-server", disable_help_subcommand = true)]
struct Cli {
    /// Transport to serve on.
    #[arg(long, value_enum, default_value_t = TransportArg::default())]
    transport: TransportArg,
    /// Bind host:port; required for `tcp` and `http`.
    #[arg(long, value_name = "HOST:PORT")]
    bind: Option<String>,
    /// Optional bearer token clients must present. Omit to accept every
    /// request (suitable for loopback-only use).
    #[arg(long, value_name = "TOKEN")]
    api_key: Option<String>,
    /// Enable gateway mode, proxying matched requests to backends.
    #[arg(long)]
    gateway: bool,
    /// Path to the gateway backend config file (JSON). A missing file
    /// disables backends without aborting start-up; malformed JSON aborts.
    #[arg(long, value_name = "PATH", default_value = "gateway.json")]
    gateway_config: PathBuf,
    /// Serve static files from this directory for HTTP paths outside
    /// `/call_tool` and `/events`. Ignored for non-HTTP transports.
    #[arg(long, value_name = "DIR")]
    document_root: Option<PathBuf>,
    /// Append audit events as JSON lines to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Minimum audit detail to record.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
    /// Detach from the controlling terminal after start-up. Accepted for
    /// compatibility; this build logs a warning and continues in the
    /// foreground rather than forking, since double-forking needs unsafe
    /// code this workspace does not allow.
    #[cfg(not(windows))]
    #[arg(long)]
    daemon: bool,
    /// Optional configuration file overriding the built-in defaults before
    /// CLI flags are layered on top.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Start-up failure, reported on stderr with exit code 1.
#[derive(Debug, Error)]
enum StartupError {
    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Handler registration failed (duplicate URI/name).
    #[error("server build error: {0}")]
    Build(#[from] BuildError),
    /// The gateway backend config file was malformed.
    #[error("gateway config error: {0}")]
    Gateway(#[from] mcp_gateway::GatewayConfigError),
    /// The audit log file could not be opened.
    #[error("failed to open log file: {0}")]
    LogFile(std::io::Error),
    /// Binding the requested transport address failed.
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    /// A transport-specific error surfaced while serving.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mcp-server: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    #[cfg(not(windows))]
    if cli.daemon {
        eprintln!("mcp-server: --daemon is accepted but not implemented; continuing in the foreground");
    }

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    let audit: Arc<dyn McpAuditSink> = build_audit_sink(&cli)?;
    let gateway = build_gateway(&cli)?;

    let mut builder = McpServerBuilder::new().with_config(config.clone()).with_audit(audit);
    if let Some(gateway) = gateway {
        builder = builder.with_gateway(gateway);
    }
    let server = builder
        .register_resource(handlers::greet_resource(), handlers::greet_handler())?
        .register_template(handlers::user_template(), handlers::user_handler())?
        .register_tool(handlers::echo_tool(), handlers::echo_handler())?
        .build()?;

    let server = Arc::new(server);
    let pool_config = config.pool.to_worker_pool_config();
    let graceful_shutdown = pool_config.graceful_shutdown;

    match cli.transport {
        TransportArg::Stdio => run_stdio(server, pool_config, graceful_shutdown, config.transport.max_frame_bytes).await,
        TransportArg::Tcp => run_tcp(server, pool_config, graceful_shutdown, &config).await,
        TransportArg::Http => run_http(server, pool_config, graceful_shutdown, &cli, &config).await,
    }
}

fn apply_cli_overrides(config: &mut ServerConfig, cli: &Cli) {
    config.transport.kind = match cli.transport {
        TransportArg::Stdio => mcp_server::config::TransportKind::Stdio,
        TransportArg::Tcp => mcp_server::config::TransportKind::Tcp,
        TransportArg::Http => mcp_server::config::TransportKind::Http,
    };
    if let Some(bind) = &cli.bind {
        config.transport.bind = Some(bind.clone());
    }
    if let Some(api_key) = &cli.api_key {
        config.auth.bearer_tokens.push(api_key.clone());
    }
    if let Some(log_file) = &cli.log_file {
        config.audit.path = Some(log_file.to_string_lossy().into_owned());
    }
}

fn build_audit_sink(cli: &Cli) -> Result<Arc<dyn McpAuditSink>, StartupError> {
    let inner: Arc<dyn McpAuditSink> = match &cli.log_file {
        Some(path) => Arc::new(FileAuditSink::new(&path.to_string_lossy()).map_err(StartupError::LogFile)?),
        None => Arc::new(StderrAuditSink),
    };
    Ok(Arc::new(LeveledAuditSink {
        inner,
        errors_only: cli.log_level == LogLevel::Error,
    }))
}

fn build_gateway(cli: &Cli) -> Result<Option<GatewayRouter>, StartupError> {
    if !cli.gateway {
        return Ok(None);
    }
    let gateway_config = mcp_gateway::load_gateway_config(&cli.gateway_config)?;
    Ok(Some(GatewayRouter::from_descriptors(gateway_config.backends, PoolConfig::default())))
}

/// Wraps an audit sink to drop non-error events when `--log-level error`
/// is selected.
struct LeveledAuditSink {
    inner: Arc<dyn McpAuditSink>,
    errors_only: bool,
}

impl McpAuditSink for LeveledAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        if self.errors_only && event.outcome != McpOutcome::Error.as_str() {
            return;
        }
        self.inner.record(event);
    }
}

/// Consumes `dispatcher`'s sole remaining strong reference and runs its
/// graceful shutdown. Every transport drops its clone of the message
/// callback before calling this, so the reference count is expected to be
/// one; if some clone outlives the transport shutdown, the pool is left to
/// finish draining on its own rather than blocking process exit forever.
fn shutdown_dispatcher(dispatcher: Arc<Dispatcher>, graceful_shutdown: Duration) {
    match Arc::try_unwrap(dispatcher) {
        Ok(dispatcher) => dispatcher.shutdown(graceful_shutdown),
        Err(_) => eprintln!("mcp-server: dispatcher still referenced elsewhere, skipping graceful pool drain"),
    }
}

// ============================================================================
// SECTION: Transport Runners
// ============================================================================

async fn run_stdio(server: Arc<mcp_server::McpServer>, pool_config: mcp_core::WorkerPoolConfig, graceful_shutdown: Duration, max_frame_bytes: usize) -> Result<(), StartupError> {
    let dispatcher = Arc::new(Dispatcher::start(server, pool_config, "stdio"));
    let transport = Arc::new(StdioTransport::new(max_frame_bytes));
    transport.start(dispatcher.message_callback());

    let joiner = Arc::clone(&transport);
    let eof = tokio::task::spawn_blocking(move || joiner.join());

    tokio::select! {
        _ = eof => {}
        _ = tokio::signal::ctrl_c() => {
            transport.stop();
        }
    }
    drop(transport);

    shutdown_dispatcher(dispatcher, graceful_shutdown);
    Ok(())
}

async fn run_tcp(server: Arc<mcp_server::McpServer>, pool_config: mcp_core::WorkerPoolConfig, graceful_shutdown: Duration, config: &ServerConfig) -> Result<(), StartupError> {
    let bind = config.transport.bind.clone().ok_or_else(|| StartupError::Transport("tcp transport requires --bind".to_string()))?;

    let dispatcher = Arc::new(Dispatcher::start(server, pool_config, "tcp"));
    let tcp_config = TcpTransportConfig {
        max_frame_bytes: config.transport.max_frame_bytes,
        idle_timeout: Some(Duration::from_secs(300)),
    };
    let (transport, listener) = TcpTransport::bind(&bind, tcp_config).map_err(|err| StartupError::Bind(bind.clone(), io_error_from(err)))?;
    transport.start(listener, dispatcher.message_callback());

    tokio::signal::ctrl_c().await.map_err(|err| StartupError::Transport(err.to_string()))?;
    transport.stop();
    drop(transport);

    shutdown_dispatcher(dispatcher, graceful_shutdown);
    Ok(())
}

async fn run_http(server: Arc<mcp_server::McpServer>, pool_config: mcp_core::WorkerPoolConfig, graceful_shutdown: Duration, cli: &Cli, config: &ServerConfig) -> Result<(), StartupError> {
    let bind = config.transport.bind.clone().ok_or_else(|| StartupError::Transport("http transport requires --bind".to_string()))?;
    let addr: SocketAddr = bind.parse().map_err(|_| StartupError::Transport(format!("invalid bind address: {bind}")))?;

    let dispatcher = Arc::new(Dispatcher::start(server, pool_config, "http"));
    let sse = Arc::new(SseChannel::new(mcp_transport::DEFAULT_REPLAY_CAPACITY));
    let http_config = HttpTransportConfig {
        max_body_bytes: config.transport.max_frame_bytes,
        bearer_token_header: "authorization",
        cors: config.transport.cors.clone(),
    };

    let router = mcp_transport::http::router(dispatcher.message_callback(), http_config, sse);
    let router = match &cli.document_root {
        Some(root) => {
            let root = root.clone();
            router.fallback(move |uri: axum::http::Uri| staticfiles::serve(root.clone(), uri))
        }
        None => router,
    };
    let service = router.into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| StartupError::Bind(bind.clone(), err))?;
    axum::serve(listener, service)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|err| StartupError::Transport(err.to_string()))?;

    shutdown_dispatcher(dispatcher, graceful_shutdown);
    Ok(())
}

fn io_error_from(err: TcpTransportError) -> std::io::Error {
    match err {
        TcpTransportError::Bind { source, .. } => source,
    }
}

// crates/mcp-server/src/server.rs
// ============================================================================
// Module: MCP Server Facade
// Description: Composes the registry, cache, rate limiter, auth, and
//              optional gateway overlay that the dispatcher consults.
// ============================================================================

//! ## Overview
//! [`McpServer`] is inert data plus the registered handlers; it performs no
//! I/O and knows nothing about transports or worker threads. [`Dispatcher`]
//! (in `dispatcher.rs`) wraps it with a worker pool and turns it into a
//! transport-facing [`MessageCallback`](mcp_transport::MessageCallback).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use mcp_core::CacheConfig;
use mcp_core::ContentCache;
use mcp_core::RateLimitConfig;
use mcp_core::RateLimiter;
use mcp_core::Registry;
use mcp_core::RegistryError;
use mcp_core::UriTemplateRouter;
use mcp_gateway::GatewayRouter;
use mcp_types::Resource;
use mcp_types::ResourceTemplate;
use mcp_types::Tool;

use crate::audit::McpAuditSink;
use crate::audit::NoopAuditSink;
use crate::auth::TokenAuthenticator;
use crate::config::ServerConfig;
use crate::handlers::ResourceHandler;
use crate::handlers::ToolHandler;
use crate::telemetry::McpMetrics;
use crate::telemetry::NoopMetrics;

/// Errors raised while assembling an [`McpServer`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A resource, template, or tool was registered twice.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// The assembled catalog, cache, rate limiter, auth policy, and optional
/// gateway overlay a dispatcher consults for every request.
pub struct McpServer {
    pub(crate) registry: Registry,
    pub(crate) cache: ContentCache,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) authenticator: TokenAuthenticator,
    pub(crate) gateway: Option<GatewayRouter>,
    pub(crate) metrics: Arc<dyn McpMetrics>,
    pub(crate) audit: Arc<dyn McpAuditSink>,
    resource_handlers: Mutex<HashMap<String, ResourceHandler>>,
    template_router: Mutex<UriTemplateRouter<ResourceHandler>>,
    tool_handlers: Mutex<HashMap<String, ToolHandler>>,
}

impl McpServer {
    /// Resolves the handler for `uri`: an exact static-resource match first,
    /// then a URI-template match, returning the handler and any captured
    /// template variables.
    pub(crate) fn resolve_resource_handler(&self, uri: &str) -> Option<(ResourceHandler, HashMap<String, String>)> {
        if let Some(handler) = self.resource_handlers.lock().unwrap_or_else(|poison| poison.into_inner()).get(uri) {
            return Some((Arc::clone(handler), HashMap::new()));
        }
        let router = self.template_router.lock().unwrap_or_else(|poison| poison.into_inner());
        router.resolve(uri).map(|matched| (matched.value, matched.variables.into_iter().collect()))
    }

    /// Resolves the handler registered for tool `name`.
    pub(crate) fn resolve_tool_handler(&self, name: &str) -> Option<ToolHandler> {
        self.tool_handlers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .get(name)
            .map(Arc::clone)
    }
}

/// Builds an [`McpServer`] by registering resources, templates, and tools
/// alongside their handlers.
pub struct McpServerBuilder {
    config: ServerConfig,
    authenticator: TokenAuthenticator,
    gateway: Option<GatewayRouter>,
    metrics: Arc<dyn McpMetrics>,
    audit: Arc<dyn McpAuditSink>,
    registry: Registry,
    resource_handlers: HashMap<String, ResourceHandler>,
    template_router: UriTemplateRouter<ResourceHandler>,
    tool_handlers: HashMap<String, ToolHandler>,
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl McpServerBuilder {
    /// Starts a builder with default configuration, no auth tokens, no
    /// gateway, and no-op metrics/audit sinks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            authenticator: TokenAuthenticator::new(Vec::new()),
            gateway: None,
            metrics: Arc::new(NoopMetrics),
            audit: Arc::new(NoopAuditSink),
            registry: Registry::new(),
            resource_handlers: HashMap::new(),
            template_router: UriTemplateRouter::new(),
            tool_handlers: HashMap::new(),
        }
    }

    /// Applies configuration (pool sizing, rate limit, cache, auth tokens).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.authenticator = TokenAuthenticator::new(config.auth.bearer_tokens.clone());
        self.config = config;
        self
    }

    /// Installs a gateway overlay consulted before local dispatch.
    #[must_use]
    pub fn with_gateway(mut self, gateway: GatewayRouter) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Installs a metrics sink, replacing the default no-op sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Installs an audit sink, replacing the default no-op sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn McpAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Registers a static resource with its read handler.
    ///
    /// # Errors
    /// Returns [`BuildError::Registry`] if `resource.uri` is already
    /// registered.
    pub fn register_resource(mut self, resource: Resource, handler: ResourceHandler) -> Result<Self, BuildError> {
        let uri = resource.uri.clone();
        self.registry.add_resource(resource)?;
        self.resource_handlers.insert(uri, handler);
        Ok(self)
    }

    /// Registers a URI-templated resource with its read handler.
    ///
    /// # Errors
    /// Returns [`BuildError::Registry`] if `template.uri_template` is
    /// already registered.
    pub fn register_template(mut self, template: ResourceTemplate, handler: ResourceHandler) -> Result<Self, BuildError> {
        let uri_template = template.uri_template.clone();
        self.registry.add_template(template)?;
        self.template_router.register(uri_template, handler);
        Ok(self)
    }

    /// Registers a tool with its call handler.
    ///
    /// # Errors
    /// Returns [`BuildError::Registry`] if `tool.name` is already
    /// registered.
    pub fn register_tool(mut self, tool: Tool, handler: ToolHandler) -> Result<Self, BuildError> {
        let name = tool.name.clone();
        self.registry.add_tool(tool)?;
        self.tool_handlers.insert(name, handler);
        Ok(self)
    }

    /// Finalizes the server.
    ///
    /// # Errors
    /// Returns [`BuildError`] if registration state is inconsistent (kept
    /// for forward compatibility; the current builder surface cannot
    /// actually leave the server in a bad state by the time `build` runs).
    pub fn build(self) -> Result<McpServer, BuildError> {
        let cache = ContentCache::new(self.config.cache.to_cache_config());
        let rate_limiter = RateLimiter::new(self.config.rate_limit.to_rate_limit_config());
        Ok(McpServer {
            registry: self.registry,
            cache,
            rate_limiter,
            authenticator: self.authenticator,
            gateway: self.gateway,
            metrics: self.metrics,
            audit: self.audit,
            resource_handlers: Mutex::new(self.resource_handlers),
            template_router: Mutex::new(self.template_router),
            tool_handlers: Mutex::new(self.tool_handlers),
        })
    }
}

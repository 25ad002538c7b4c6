// crates/mcp-gateway/src/router.rs
// ============================================================================
// Module: Gateway Router
// Description: Matches an incoming request against registered backends.
// ============================================================================

use std::sync::Arc;

use crate::config::BackendDescriptor;
use crate::pool::ConnectionPool;
use crate::pool::PoolConfig;

/// A registered gateway backend: its routing rules and its connection pool.
pub struct Backend {
    /// Backend name, as it appears in the config file.
    pub name: String,
    /// Tool names this backend handles.
    pub tool_names: Vec<String>,
    /// URI prefixes this backend handles.
    pub resource_prefixes: Vec<String>,
    /// URI templates (literal segments and `{var}` placeholders) this
    /// backend handles.
    pub resource_templates: Vec<String>,
    /// The backend's TCP connection pool.
    pub pool: Arc<ConnectionPool>,
}

/// The kind of inbound request being matched against backends.
pub enum GatewayRequest<'a> {
    /// A `call_tool` request naming a tool.
    CallTool {
        /// The tool name from the request.
        name: &'a str,
    },
    /// A `read_resource` request naming a URI.
    ReadResource {
        /// The URI from the request.
        uri: &'a str,
    },
}

/// Routes requests to registered backends in registration order, first
/// match wins.
pub struct GatewayRouter {
    backends: Vec<Backend>,
}

impl GatewayRouter {
    /// Builds a router from `descriptors`, opening one connection pool per
    /// backend with `pool_config`.
    #[must_use]
    pub fn from_descriptors(descriptors: Vec<BackendDescriptor>, pool_config: PoolConfig) -> Self {
        let backends = descriptors
            .into_iter()
            .map(|descriptor| Backend {
                name: descriptor.name,
                tool_names: descriptor.routing.tool_names,
                resource_prefixes: descriptor.routing.resource_prefixes,
                resource_templates: descriptor.routing.resource_templates,
                pool: ConnectionPool::new(descriptor.address, pool_config),
            })
            .collect();
        Self { backends }
    }

    /// Finds the first backend claiming `request`, if any.
    #[must_use]
    pub fn resolve(&self, request: &GatewayRequest<'_>) -> Option<&Backend> {
        self.backends.iter().find(|backend| backend_claims(backend, request))
    }

    /// Returns the registered backends in registration order.
    #[must_use]
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Shuts down every backend's connection pool.
    pub fn shutdown(&self) {
        for backend in &self.backends {
            backend.pool.shutdown();
        }
    }
}

fn backend_claims(backend: &Backend, request: &GatewayRequest<'_>) -> bool {
    match request {
        GatewayRequest::CallTool { name } => backend.tool_names.iter().any(|candidate| candidate == name),
        GatewayRequest::ReadResource { uri } => {
            backend.resource_prefixes.iter().any(|prefix| uri.starts_with(prefix.as_str()))
                || backend
                    .resource_templates
                    .iter()
                    .any(|template| template_matches(template, uri))
        }
    }
}

fn template_matches(template: &str, uri: &str) -> bool {
    let template_segments: Vec<&str> = template.split('/').collect();
    let uri_segments: Vec<&str> = uri.split('/').collect();
    if template_segments.len() != uri_segments.len() {
        return false;
    }
    template_segments.iter().zip(uri_segments.iter()).all(|(template_segment, uri_segment)| {
        (template_segment.starts_with('{') && template_segment.ends_with('}') && !uri_segment.is_empty())
            || template_segment == uri_segment
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::BackendDescriptor;
    use crate::config::BackendRouting;

    fn descriptor(name: &str, routing: BackendRouting) -> BackendDescriptor {
        BackendDescriptor {
            name: name.to_string(),
            address: "127.0.0.1:1".to_string(),
            routing,
        }
    }

    #[test]
    fn call_tool_matches_by_tool_name() {
        let router = GatewayRouter::from_descriptors(
            vec![descriptor(
                "b1",
                BackendRouting {
                    tool_names: vec!["echo".to_string()],
                    ..Default::default()
                },
            )],
            PoolConfig::default(),
        );
        let backend = router.resolve(&GatewayRequest::CallTool { name: "echo" }).expect("match");
        assert_eq!(backend.name, "b1");
        assert!(router.resolve(&GatewayRequest::CallTool { name: "other" }).is_none());
        router.shutdown();
    }

    #[test]
    fn read_resource_matches_by_prefix_or_template() {
        let router = GatewayRouter::from_descriptors(
            vec![descriptor(
                "b1",
                BackendRouting {
                    resource_prefixes: vec!["ex://static/".to_string()],
                    resource_templates: vec!["ex://user/{name}".to_string()],
                    ..Default::default()
                },
            )],
            PoolConfig::default(),
        );
        assert!(router.resolve(&GatewayRequest::ReadResource { uri: "ex://static/a" }).is_some());
        assert!(router.resolve(&GatewayRequest::ReadResource { uri: "ex://user/alice" }).is_some());
        assert!(router.resolve(&GatewayRequest::ReadResource { uri: "ex://other" }).is_none());
        router.shutdown();
    }

    #[test]
    fn first_registered_backend_wins_on_ambiguity() {
        let router = GatewayRouter::from_descriptors(
            vec![
                descriptor(
                    "first",
                    BackendRouting {
                        tool_names: vec!["echo".to_string()],
                        ..Default::default()
                    },
                ),
                descriptor(
                    "second",
                    BackendRouting {
                        tool_names: vec!["echo".to_string()],
                        ..Default::default()
                    },
                ),
            ],
            PoolConfig::default(),
        );
        let backend = router.resolve(&GatewayRequest::CallTool { name: "echo" }).expect("match");
        assert_eq!(backend.name, "first");
        router.shutdown();
    }
}

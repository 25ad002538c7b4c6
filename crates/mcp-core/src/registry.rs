// crates/mcp-core/src/registry.rs
// ============================================================================
// Module: Resource/Tool Registry
// Description: Insertion-ordered catalog of resources, templates, and tools.
// ============================================================================

use std::sync::Mutex;

use mcp_types::Resource;
use mcp_types::ResourceTemplate;
use mcp_types::Tool;

/// Errors raised while registering an entry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A resource, template, or tool with this key is already registered.
    #[error("duplicate registration for {0:?}")]
    Duplicate(String),
}

struct State {
    resources: Vec<Resource>,
    templates: Vec<ResourceTemplate>,
    tools: Vec<Tool>,
}

/// The catalog of resources, resource templates, and tools a server exposes.
///
/// Entries are kept in insertion order and listed back in that order.
/// Registering a duplicate `uri`, `uri_template`, or tool `name` is
/// rejected rather than silently overwriting the earlier entry (I1).
pub struct Registry {
    state: Mutex<State>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                resources: Vec::new(),
                templates: Vec::new(),
                tools: Vec::new(),
            }),
        }
    }

    /// Registers a concrete resource.
    ///
    /// # Errors
    /// Returns [`RegistryError::Duplicate`] if `resource.uri` is already
    /// registered.
    pub fn add_resource(&self, resource: Resource) -> Result<(), RegistryError> {
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        if state.resources.iter().any(|existing| existing.uri == resource.uri) {
            return Err(RegistryError::Duplicate(resource.uri));
        }
        state.resources.push(resource);
        Ok(())
    }

    /// Registers a resource template.
    ///
    /// # Errors
    /// Returns [`RegistryError::Duplicate`] if `template.uri_template` is
    /// already registered.
    pub fn add_template(&self, template: ResourceTemplate) -> Result<(), RegistryError> {
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        if state.templates.iter().any(|existing| existing.uri_template == template.uri_template) {
            return Err(RegistryError::Duplicate(template.uri_template));
        }
        state.templates.push(template);
        Ok(())
    }

    /// Registers a tool.
    ///
    /// # Errors
    /// Returns [`RegistryError::Duplicate`] if `tool.name` is already
    /// registered.
    pub fn add_tool(&self, tool: Tool) -> Result<(), RegistryError> {
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        if state.tools.iter().any(|existing| existing.name == tool.name) {
            return Err(RegistryError::Duplicate(tool.name));
        }
        state.tools.push(tool);
        Ok(())
    }

    /// Lists registered resources in insertion order.
    #[must_use]
    pub fn list_resources(&self) -> Vec<Resource> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner()).resources.clone()
    }

    /// Lists registered resource templates in insertion order.
    #[must_use]
    pub fn list_templates(&self) -> Vec<ResourceTemplate> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner()).templates.clone()
    }

    /// Lists registered tools in insertion order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner()).tools.clone()
    }

    /// Looks up a single tool by name.
    #[must_use]
    pub fn find_tool(&self, name: &str) -> Option<Tool> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .tools
            .iter()
            .find(|tool| tool.name == name)
            .cloned()
    }

    /// Looks up a single resource by URI.
    #[must_use]
    pub fn find_resource(&self, uri: &str) -> Option<Resource> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .resources
            .iter()
            .find(|resource| resource.uri == uri)
            .cloned()
    }
}

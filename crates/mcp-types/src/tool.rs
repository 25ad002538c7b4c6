// crates/mcp-types/src/tool.rs
// ============================================================================
// Module: Tools
// Description: Named, parameterised server actions.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// A single named parameter accepted by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name.
    pub name: String,
    /// JSON schema primitive type name (e.g. `"string"`, `"number"`).
    #[serde(rename = "type")]
    pub param_type: String,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter must be supplied.
    pub required: bool,
}

impl ToolParameter {
    /// Builds a new tool parameter descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: None,
            required,
        }
    }

    /// Returns a copy with the description set.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named, parameterised action returning structured content.
///
/// # Invariants
/// - `name` is non-empty and unique within a single registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Server-unique tool name.
    pub name: String,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered list of accepted parameters.
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl Tool {
    /// Builds a new tool descriptor with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
        }
    }

    /// Returns a copy with the description set.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns a copy with the given parameter appended.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

// crates/mcp-types/src/resource.rs
// ============================================================================
// Module: Resources
// Description: Static resources and URI-templated resources.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// A URI-addressable, read-only piece of content.
///
/// # Invariants
/// - `uri` is non-empty and unique within a single registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Server-unique resource URI.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Optional MIME type of the resource content.
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource {
    /// Builds a new resource descriptor.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            mime_type: None,
            description: None,
        }
    }

    /// Returns a copy with the MIME type set.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns a copy with the description set.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A resource URI pattern carrying `{var}` placeholders.
///
/// # Invariants
/// - `uri_template` is non-empty and unique within a single registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// Server-unique URI template, e.g. `ex://user/{name}`.
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Human-readable name.
    pub name: String,
    /// Optional MIME type of the resolved content.
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceTemplate {
    /// Builds a new resource template descriptor.
    #[must_use]
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            mime_type: None,
            description: None,
        }
    }

    /// Returns a copy with the MIME type set.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns a copy with the description set.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn resource_serializes_with_camel_case_mime_field() {
        let resource = Resource::new("ex://greet", "Greet").with_mime_type("text/plain");
        let value = serde_json::to_value(&resource).expect("serialize");
        assert_eq!(value["mimeType"], "text/plain");
    }

    #[test]
    fn template_serializes_uri_template_field() {
        let template = ResourceTemplate::new("ex://user/{name}", "User");
        let value = serde_json::to_value(&template).expect("serialize");
        assert_eq!(value["uriTemplate"], "ex://user/{name}");
        assert!(value.get("description").is_none());
    }
}

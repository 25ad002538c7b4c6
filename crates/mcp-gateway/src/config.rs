// crates/mcp-gateway/src/config.rs
// ============================================================================
// Module: Gateway Config
// Description: Loads the backend descriptor list from a JSON config file.
// ============================================================================

use std::path::Path;

use serde::Deserialize;

/// Routing rules a backend advertises for matching incoming requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendRouting {
    /// Tool names this backend handles for `call_tool`.
    #[serde(default)]
    pub tool_names: Vec<String>,
    /// URI prefixes this backend handles for `read_resource`.
    #[serde(default)]
    pub resource_prefixes: Vec<String>,
    /// URI templates (with `{var}` placeholders) this backend handles.
    #[serde(default)]
    pub resource_templates: Vec<String>,
}

/// One gateway backend entry as it appears in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendDescriptor {
    /// Human-readable backend name.
    pub name: String,
    /// `host:port` TCP address of the backend.
    pub address: String,
    /// Matching rules for this backend.
    #[serde(default)]
    pub routing: BackendRouting,
}

/// The top-level shape of a gateway config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    /// Backend descriptors, consulted in this order.
    #[serde(default)]
    pub backends: Vec<BackendDescriptor>,
}

/// Errors raised while loading a gateway config file.
#[derive(Debug, thiserror::Error)]
pub enum GatewayConfigError {
    /// The file exists but could not be read.
    #[error("failed to read gateway config {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file content was not valid JSON or did not match the expected
    /// shape.
    #[error("failed to parse gateway config {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Loads a [`GatewayConfig`] from `path`.
///
/// A missing file is not an error: it returns an empty config, disabling
/// gateway backends without aborting start-up. A file that exists but
/// contains malformed JSON is an error.
///
/// # Errors
/// Returns [`GatewayConfigError::Read`] if the file exists but cannot be
/// read, or [`GatewayConfigError::Parse`] if its content is not valid JSON
/// matching the expected shape.
pub fn load_gateway_config(path: &Path) -> Result<GatewayConfig, GatewayConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(GatewayConfig::default()),
        Err(err) => {
            return Err(GatewayConfigError::Read {
                path: path.display().to_string(),
                source: err,
            });
        }
    };
    serde_json::from_str(&content).map_err(|err| GatewayConfigError::Parse {
        path: path.display().to_string(),
        source: err,
    })
}

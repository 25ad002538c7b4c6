// crates/mcp-types/src/content.rs
// ============================================================================
// Module: Content Items
// Description: The {type, mime, bytes} triple returned by reads and calls.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// Classification of a [`ContentItem`]'s payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// UTF-8 text payload.
    Text,
    /// Image payload, typically base64-encoded on the wire.
    Image,
    /// Opaque binary payload.
    Binary,
}

/// A single unit of content returned by a resource read or tool call.
///
/// # Invariants
/// - `data_size` always equals `data.len()`; use the constructors below
///   rather than building the struct literal directly to preserve this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Content classification.
    pub content_type: ContentType,
    /// Optional MIME type of the payload.
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// Byte length of `data`, kept in sync by the constructors.
    pub data_size: usize,
}

impl ContentItem {
    /// Builds a text content item from a UTF-8 string.
    #[must_use]
    pub fn text(data: impl Into<String>) -> Self {
        let bytes = data.into().into_bytes();
        Self {
            content_type: ContentType::Text,
            mime_type: Some("text/plain".to_string()),
            data_size: bytes.len(),
            data: bytes,
        }
    }

    /// Builds an image content item from raw bytes and a MIME type.
    #[must_use]
    pub fn image(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Image,
            mime_type: Some(mime_type.into()),
            data_size: data.len(),
            data,
        }
    }

    /// Builds a binary content item from raw bytes.
    #[must_use]
    pub fn binary(data: Vec<u8>, mime_type: Option<String>) -> Self {
        Self {
            content_type: ContentType::Binary,
            mime_type,
            data_size: data.len(),
            data,
        }
    }

    /// Returns the content as a UTF-8 string, if it decodes cleanly.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn text_constructor_keeps_data_size_in_sync() {
        let item = ContentItem::text("Hello");
        assert_eq!(item.data_size, 5);
        assert_eq!(item.as_text(), Some("Hello"));
    }

    #[test]
    fn binary_constructor_allows_missing_mime_type() {
        let item = ContentItem::binary(vec![1, 2, 3], None);
        assert_eq!(item.data_size, 3);
        assert!(item.mime_type.is_none());
    }
}

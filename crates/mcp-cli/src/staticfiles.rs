// crates/mcp-cli/src/staticfiles.rs
// ============================================================================
// Module: Static File Fallback
// Description: Serves files from a configured document root for HTTP paths
//              outside `/call_tool` and `/events`.
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::response::Response;

/// Resolves `uri` under `root` and serves it, rejecting any path that would
/// escape the root after normalisation. Directory requests are mapped to
/// `index.html`; anything missing or outside the root is a 404.
pub async fn serve(root: PathBuf, uri: Uri) -> Response {
    let Some(path) = resolve(&root, uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = guess_mime_type(&path);
            ([(axum::http::header::CONTENT_TYPE, mime)], Body::from(bytes)).into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Joins `request_path` onto `root`, rejecting `..` segments so a request
/// can never read outside the document root.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    let mut resolved = root.to_path_buf();
    if trimmed.is_empty() {
        resolved.push("index.html");
        return Some(resolved);
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return None;
        }
        resolved.push(segment);
    }
    Some(resolved)
}

fn guess_mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

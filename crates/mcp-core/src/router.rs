// crates/mcp-core/src/router.rs
// ============================================================================
// Module: URI Template Router
// Description: Matches concrete URIs against registered `{var}` templates.
// ============================================================================

use std::collections::BTreeMap;

/// The result of a successful [`UriTemplateRouter::resolve`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<T> {
    /// Variable bindings captured from `{var}` segments, in template order.
    pub variables: BTreeMap<String, String>,
    /// The value registered alongside the matched template.
    pub value: T,
}

/// Routes concrete URIs against a set of single-segment `{var}` templates,
/// registered in the order they were added.
///
/// Matching is linear in the number of registered templates. A template
/// segment of the form `{name}` matches exactly one non-empty, `/`-free
/// path segment; every other segment must match the literal text. When more
/// than one template could match a URI, the first one registered wins.
#[derive(Debug, Clone, Default)]
pub struct UriTemplateRouter<T> {
    templates: Vec<(String, T)>,
}

impl<T: Clone> UriTemplateRouter<T> {
    /// Builds an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self { templates: Vec::new() }
    }

    /// Registers `template` (e.g. `"ex://user/{name}"`) with an associated
    /// `value`, appended after any existing templates.
    pub fn register(&mut self, template: impl Into<String>, value: T) {
        self.templates.push((template.into(), value));
    }

    /// Attempts to match `uri` against the registered templates, returning
    /// the first (in registration order) that matches.
    #[must_use]
    pub fn resolve(&self, uri: &str) -> Option<RouteMatch<T>> {
        let uri_segments: Vec<&str> = uri.split('/').collect();
        for (template, value) in &self.templates {
            let template_segments: Vec<&str> = template.split('/').collect();
            if let Some(variables) = match_segments(&template_segments, &uri_segments) {
                return Some(RouteMatch {
                    variables,
                    value: value.clone(),
                });
            }
        }
        None
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn match_segments(template_segments: &[&str], uri_segments: &[&str]) -> Option<BTreeMap<String, String>> {
    if template_segments.len() != uri_segments.len() {
        return None;
    }
    let mut variables = BTreeMap::new();
    for (template_segment, uri_segment) in template_segments.iter().zip(uri_segments.iter()) {
        if let Some(name) = template_segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
            if uri_segment.is_empty() {
                return None;
            }
            variables.insert(name.to_string(), (*uri_segment).to_string());
        } else if template_segment != uri_segment {
            return None;
        }
    }
    Some(variables)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn literal_template_matches_exact_uri() {
        let mut router = UriTemplateRouter::new();
        router.register("ex://status", "status-handler");
        let result = router.resolve("ex://status").expect("match");
        assert!(result.variables.is_empty());
        assert_eq!(result.value, "status-handler");
    }

    #[test]
    fn single_variable_binds_one_segment() {
        let mut router = UriTemplateRouter::new();
        router.register("ex://user/{name}", "user-handler");
        let result = router.resolve("ex://user/alice").expect("match");
        assert_eq!(result.variables.get("name"), Some(&"alice".to_string()));
    }

    #[test]
    fn variable_does_not_span_segments() {
        let mut router = UriTemplateRouter::new();
        router.register("ex://user/{name}", "user-handler");
        assert!(router.resolve("ex://user/alice/extra").is_none());
    }

    #[test]
    fn first_registered_template_wins_on_ambiguity() {
        let mut router = UriTemplateRouter::new();
        router.register("ex://{kind}/alice", "generic");
        router.register("ex://user/alice", "specific");
        let result = router.resolve("ex://user/alice").expect("match");
        assert_eq!(result.value, "generic");
    }

    #[test]
    fn empty_segment_does_not_satisfy_a_variable() {
        let mut router = UriTemplateRouter::new();
        router.register("ex://user/{name}", "user-handler");
        assert!(router.resolve("ex://user/").is_none());
    }

    #[test]
    fn no_templates_never_match() {
        let router: UriTemplateRouter<&str> = UriTemplateRouter::new();
        assert!(router.resolve("ex://anything").is_none());
    }

    proptest::proptest! {
        #[test]
        fn variable_binding_round_trips_arbitrary_segment(segment in "[a-zA-Z0-9_-]{1,16}") {
            let mut router = UriTemplateRouter::new();
            router.register("ex://user/{name}", "user-handler");
            let uri = format!("ex://user/{segment}");
            let result = router.resolve(&uri).expect("match");
            proptest::prop_assert_eq!(result.variables.get("name"), Some(&segment));
        }
    }
}

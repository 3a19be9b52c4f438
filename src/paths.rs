//! Route and Subject Templates
//!
//! Splits route templates (`/api/payments/<id>`) and subject templates
//! (`orders.<region>.[rest]`) into a static prefix and named parameters.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How much of a subject a wildcard part matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WildcardKind {
    /// Exactly one token (`<name>`, subscribed as `*`)
    SingleToken,
    /// One or more trailing tokens (`[name]`, subscribed as `>`)
    MultiToken,
}

impl WildcardKind {
    /// The subscription wildcard for this kind
    pub fn token(&self) -> &'static str {
        match self {
            WildcardKind::SingleToken => "*",
            WildcardKind::MultiToken => ">",
        }
    }
}

/// A decomposed route template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    pub prefix: String,
    pub params: Vec<String>,
}

/// A decomposed subject template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTemplate {
    pub base: String,
    pub parts: Vec<String>,
    pub wildcards: IndexMap<String, WildcardKind>,
}

/// Split a route template on `/`.
///
/// Segments before the first `<name>` segment form the prefix. That segment
/// and every one after it are parameters, in order. A literal segment after
/// a parameter is taken as a parameter name as written.
pub fn decompose_route(template: &str) -> RouteTemplate {
    let mut prefix: Vec<&str> = Vec::new();
    let mut params = Vec::new();

    for segment in template.split('/') {
        if params.is_empty() && !is_bracketed(segment, '<', '>') {
            prefix.push(segment);
        } else {
            params.push(strip_brackets(segment).to_string());
        }
    }

    RouteTemplate {
        prefix: prefix.join("/"),
        params,
    }
}

/// Split a subject template on `.`.
///
/// Leading segments that do not start with `<` or `[` form the base subject.
/// The remaining segments are wildcard parts: `<name>` matches one token,
/// `[name]` matches the rest of the subject.
pub fn decompose_subject(template: &str) -> SubjectTemplate {
    let mut base: Vec<&str> = Vec::new();
    let mut parts = Vec::new();
    let mut wildcards = IndexMap::new();

    for segment in template.split('.') {
        let is_wildcard = segment.starts_with('<') || segment.starts_with('[');
        if parts.is_empty() && !is_wildcard {
            base.push(segment);
            continue;
        }
        let kind = if segment.starts_with('[') {
            WildcardKind::MultiToken
        } else {
            WildcardKind::SingleToken
        };
        let name = strip_brackets(segment).to_string();
        wildcards.insert(name.clone(), kind);
        parts.push(name);
    }

    SubjectTemplate {
        base: base.join(".").trim_end_matches('.').to_string(),
        parts,
        wildcards,
    }
}

fn is_bracketed(segment: &str, open: char, close: char) -> bool {
    segment.len() >= 2 && segment.starts_with(open) && segment.ends_with(close)
}

fn strip_brackets(segment: &str) -> &str {
    segment
        .trim_start_matches(&['<', '['][..])
        .trim_end_matches(&['>', ']'][..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_with_params() {
        let route = decompose_route("/api/<a>/<b>");
        assert_eq!(route.prefix, "/api");
        assert_eq!(route.params, vec!["a", "b"]);
    }

    #[test]
    fn test_route_without_params() {
        let route = decompose_route("/api/items");
        assert_eq!(route.prefix, "/api/items");
        assert!(route.params.is_empty());
    }

    #[test]
    fn test_route_literal_after_param_is_kept_as_param() {
        let route = decompose_route("/api/<id>/history");
        assert_eq!(route.prefix, "/api");
        assert_eq!(route.params, vec!["id", "history"]);
    }

    #[test]
    fn test_route_param_at_root() {
        let route = decompose_route("/<tenant>");
        assert_eq!(route.prefix, "");
        assert_eq!(route.params, vec!["tenant"]);
    }

    #[test]
    fn test_subject_with_both_wildcards() {
        let subject = decompose_subject("orders.<region>.[rest]");
        assert_eq!(subject.base, "orders");
        assert_eq!(subject.parts, vec!["region", "rest"]);
        assert_eq!(subject.wildcards["region"], WildcardKind::SingleToken);
        assert_eq!(subject.wildcards["rest"], WildcardKind::MultiToken);
    }

    #[test]
    fn test_subject_multi_segment_base() {
        let subject = decompose_subject("acme.billing.invoices.<id>");
        assert_eq!(subject.base, "acme.billing.invoices");
        assert_eq!(subject.parts, vec!["id"]);
    }

    #[test]
    fn test_subject_without_wildcards() {
        let subject = decompose_subject("system.heartbeat");
        assert_eq!(subject.base, "system.heartbeat");
        assert!(subject.parts.is_empty());
        assert!(subject.wildcards.is_empty());
    }

    #[test]
    fn test_wildcard_tokens() {
        assert_eq!(WildcardKind::SingleToken.token(), "*");
        assert_eq!(WildcardKind::MultiToken.token(), ">");
        assert_eq!(
            serde_json::to_value(WildcardKind::MultiToken).unwrap(),
            serde_json::json!("multi-token")
        );
    }
}

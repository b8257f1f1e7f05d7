//! Placeholder detection, resolution, and substitution in JSON templates.
//!
//! Placeholders are non-greedy `$(...)` spans. The keyword form `$(!Name...)`
//! dispatches to a computed value provider; every other form is a JSON path
//! lookup against the served event's lookup document.

use crate::config::ServedEvent;
use crate::keyword;
use jsonpath_rust::JsonPath;
use regex::Regex;
use serde_json::{json, Value};

/// Error raised while resolving a placeholder pattern.
#[derive(Debug, thiserror::Error)]
pub enum PlaceholderError {
    /// A `.plus[...]` argument tail that fails the offset grammar.
    #[error("invalid time calculation pattern '{0}'")]
    InvalidTimeOffset(String),
}

/// Read-only JSON tree a served event exposes to path-lookup placeholders.
///
/// Built once per served event and reused for every placeholder in that
/// event's callbacks.
pub struct LookupDocument {
    root: Value,
}

impl LookupDocument {
    /// Assemble the document for a served event.
    ///
    /// Bodies that are absent or not valid JSON appear as `null`; the request
    /// URL contributes its non-empty path segments as the `urlParts` array.
    pub fn for_served_event(event: &ServedEvent) -> Self {
        Self {
            root: json!({
                "request": parse_body(event.request_body.as_deref()),
                "response": parse_body(event.response_body.as_deref()),
                "urlParts": split_url(&event.url),
            }),
        }
    }

    /// Evaluate a JSON path expression against the document.
    ///
    /// Every miss (invalid expression, absent leaf, empty match set) is
    /// `Value::Null`, never an error.
    pub fn lookup(&self, path: &str) -> Value {
        let Ok(compiled) = JsonPath::try_from(path) else {
            return Value::Null;
        };
        match compiled.find(&self.root) {
            Value::Array(mut hits) => {
                if hits.is_empty() {
                    Value::Null
                } else {
                    hits.remove(0)
                }
            }
            other => other,
        }
    }
}

fn parse_body(body: Option<&str>) -> Value {
    body.and_then(|b| serde_json::from_str(b.trim()).ok())
        .unwrap_or(Value::Null)
}

/// Split a request URL into its non-empty path segments.
fn split_url(url: &str) -> Vec<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Detects and substitutes `$(...)` placeholders in JSON templates.
pub struct PlaceholderEngine {
    placeholder: Regex,
    keyword: Regex,
}

impl PlaceholderEngine {
    /// Create a new engine with compiled patterns.
    pub fn new() -> Self {
        let placeholder = Regex::new(r"\$\(.*?\)").expect("placeholder pattern is valid");
        let keyword = Regex::new(&format!(
            r"^\$\(!({})(.*)\)$",
            keyword::name_alternation()
        ))
        .expect("keyword pattern is valid");
        Self {
            placeholder,
            keyword,
        }
    }

    /// Whether the string contains a placeholder pattern.
    pub fn is_placeholder(&self, s: &str) -> bool {
        self.placeholder.is_match(s)
    }

    /// Distinct placeholder patterns in first-occurrence order.
    pub fn find_placeholders(&self, template: &str) -> Vec<String> {
        let mut patterns: Vec<String> = Vec::new();
        for found in self.placeholder.find_iter(template) {
            if !patterns.iter().any(|p| p == found.as_str()) {
                patterns.push(found.as_str().to_string());
            }
        }
        patterns
    }

    /// Resolve one placeholder pattern.
    ///
    /// Keyword patterns never consult the document. Path patterns with no
    /// matching node resolve to null; so does any pattern when no document
    /// is available.
    pub fn resolve(
        &self,
        pattern: &str,
        document: Option<&LookupDocument>,
    ) -> Result<Value, PlaceholderError> {
        if let Some(caps) = self.keyword.captures(pattern) {
            if let Some(kw) = keyword::lookup(&caps[1]) {
                return (kw.value)(&caps[2]);
            }
        }
        match document {
            Some(doc) => Ok(doc.lookup(&pattern_to_json_path(pattern))),
            None => Ok(Value::Null),
        }
    }

    /// Replace resolved placeholders in the template.
    ///
    /// Two ordered passes per pattern: the quoted form is replaced with the
    /// value's full JSON serialization, so a placeholder standing alone as a
    /// JSON value keeps its type; remaining bare occurrences then get the
    /// plain string form for in-string embedding. Quoted must run first.
    pub fn substitute(&self, resolved: &[(String, Value)], template: &str) -> String {
        let mut result = template.to_string();
        for (pattern, value) in resolved {
            let quoted = format!("\"{pattern}\"");
            let json_form = value.to_string();
            let plain_form = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            result = result
                .replace(&quoted, &json_form)
                .replace(pattern.as_str(), &plain_form);
        }
        result
    }

    /// Detect, resolve, and substitute every placeholder in a JSON template.
    pub fn transform(
        &self,
        document: Option<&LookupDocument>,
        template: &str,
    ) -> Result<String, PlaceholderError> {
        let mut resolved = Vec::new();
        for pattern in self.find_placeholders(template) {
            let value = self.resolve(&pattern, document)?;
            resolved.push((pattern, value));
        }
        Ok(self.substitute(&resolved, template))
    }
}

impl Default for PlaceholderEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate `$(dot.path)` into the root-anchored expression `$.dot.path`.
fn pattern_to_json_path(pattern: &str) -> String {
    let inner = pattern
        .strip_prefix("$(")
        .and_then(|p| p.strip_suffix(')'))
        .unwrap_or(pattern);
    format!("$.{inner}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::INSTANT_FORMAT;
    use chrono::{Duration, NaiveDateTime, Utc};

    fn sample_document() -> LookupDocument {
        LookupDocument::for_served_event(&ServedEvent {
            url: "/orders/42?verbose=true".to_string(),
            request_body: Some(r#"{"name":"Alice","callbackUrl":"http://localhost:9/cb"}"#.to_string()),
            response_body: None,
        })
    }

    #[test]
    fn test_find_placeholders_order_and_dedupe() {
        let engine = PlaceholderEngine::new();
        let template = r#"{"a":"$(x)","b":"$(!UUID)","c":"$(x)","d":"$(y)"}"#;
        assert_eq!(
            engine.find_placeholders(template),
            vec!["$(x)", "$(!UUID)", "$(y)"]
        );
    }

    #[test]
    fn test_find_placeholders_adjacent_do_not_merge() {
        let engine = PlaceholderEngine::new();
        assert_eq!(engine.find_placeholders("$(a)$(b)"), vec!["$(a)", "$(b)"]);
    }

    #[test]
    fn test_no_placeholders() {
        let engine = PlaceholderEngine::new();
        assert!(engine.find_placeholders(r#"{"plain":true}"#).is_empty());
        assert!(!engine.is_placeholder("no pattern here"));
    }

    #[test]
    fn test_resolve_path_lookup() {
        let engine = PlaceholderEngine::new();
        let doc = sample_document();
        assert_eq!(
            engine.resolve("$(request.name)", Some(&doc)).unwrap(),
            Value::String("Alice".to_string())
        );
        assert_eq!(
            engine.resolve("$(urlParts[1])", Some(&doc)).unwrap(),
            Value::String("42".to_string())
        );
        assert_eq!(
            engine.resolve("$(urlParts[0])", Some(&doc)).unwrap(),
            Value::String("orders".to_string())
        );
    }

    #[test]
    fn test_resolve_missing_path_is_null() {
        let engine = PlaceholderEngine::new();
        let doc = sample_document();
        assert_eq!(
            engine.resolve("$(response.missing)", Some(&doc)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_resolve_without_document_is_null() {
        let engine = PlaceholderEngine::new();
        assert_eq!(engine.resolve("$(request.name)", None).unwrap(), Value::Null);
    }

    #[test]
    fn test_resolve_unknown_keyword_is_lookup_miss() {
        let engine = PlaceholderEngine::new();
        let doc = sample_document();
        assert_eq!(engine.resolve("$(!Nope)", Some(&doc)).unwrap(), Value::Null);
    }

    #[test]
    fn test_resolve_keyword_bad_offset_fails() {
        let engine = PlaceholderEngine::new();
        let err = engine.resolve("$(!Instant.plus[x5])", None).unwrap_err();
        assert!(matches!(err, PlaceholderError::InvalidTimeOffset(_)));
    }

    #[test]
    fn test_resolve_keyword_descriptive_tail_ignored() {
        let engine = PlaceholderEngine::new();
        let value = engine.resolve("$(!Timestamp of the order)", None).unwrap();
        let drift = (value.as_i64().unwrap() - Utc::now().timestamp_millis()).abs();
        assert!(drift <= 5_000);
    }

    #[test]
    fn test_substitute_whole_value_keeps_type() {
        let engine = PlaceholderEngine::new();
        let resolved = vec![("$(n)".to_string(), Value::from(7))];
        let result = engine.substitute(&resolved, r#"{"count":"$(n)"}"#);
        assert_eq!(result, r#"{"count":7}"#);
    }

    #[test]
    fn test_substitute_embedded_uses_plain_string() {
        let engine = PlaceholderEngine::new();
        let resolved = vec![("$(who)".to_string(), Value::String("Alice".to_string()))];
        let result = engine.substitute(&resolved, r#"{"msg":"hello $(who)!"}"#);
        assert_eq!(result, r#"{"msg":"hello Alice!"}"#);
    }

    #[test]
    fn test_substitute_quoted_and_embedded_same_pattern() {
        let engine = PlaceholderEngine::new();
        let resolved = vec![("$(n)".to_string(), Value::from(7))];
        let result = engine.substitute(&resolved, r#"{"count":"$(n)","msg":"got $(n) items"}"#);
        assert_eq!(result, r#"{"count":7,"msg":"got 7 items"}"#);
    }

    #[test]
    fn test_substitute_null_value() {
        let engine = PlaceholderEngine::new();
        let resolved = vec![("$(gone)".to_string(), Value::Null)];
        let result = engine.substitute(&resolved, r#"{"a":"$(gone)","b":"x $(gone)"}"#);
        assert_eq!(result, r#"{"a":null,"b":"x null"}"#);
    }

    #[test]
    fn test_substitute_empty_map_is_noop() {
        let engine = PlaceholderEngine::new();
        let template = r#"{"count":7,"msg":"got 7 items"}"#;
        assert_eq!(engine.substitute(&[], template), template);
    }

    #[test]
    fn test_transform_resolves_path_and_url_parts() {
        let engine = PlaceholderEngine::new();
        let doc = sample_document();
        let result = engine
            .transform(
                Some(&doc),
                r#"{"customer":"$(request.name)","order":"$(urlParts[1])"}"#,
            )
            .unwrap();
        assert_eq!(result, r#"{"customer":"Alice","order":"42"}"#);
    }

    #[test]
    fn test_transform_keyword_template_yields_valid_json() {
        let engine = PlaceholderEngine::new();
        let result = engine
            .transform(None, r#"{"id":"$(!UUID)","when":"$(!Instant.plus[m30])"}"#)
            .unwrap();

        let parsed: Value = serde_json::from_str(&result).unwrap();
        let id = parsed["id"].as_str().unwrap();
        assert_eq!(id.len(), 36);

        let when = NaiveDateTime::parse_from_str(parsed["when"].as_str().unwrap(), INSTANT_FORMAT)
            .unwrap()
            .and_utc();
        let drift = (when - (Utc::now() + Duration::minutes(30)))
            .num_seconds()
            .abs();
        assert!(drift <= 5, "when drifted by {}s", drift);
    }

    #[test]
    fn test_transform_same_pattern_resolved_once() {
        let engine = PlaceholderEngine::new();
        let result = engine
            .transform(None, r#"{"a":"$(!UUID)","b":"$(!UUID)"}"#)
            .unwrap();
        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["a"], parsed["b"]);
    }

    #[test]
    fn test_transform_distinct_keyword_tails_resolved_independently() {
        let engine = PlaceholderEngine::new();
        let result = engine
            .transform(
                None,
                r#"{"now":"$(!Timestamp)","later":"$(!Timestamp.plus[h2])"}"#,
            )
            .unwrap();
        let parsed: Value = serde_json::from_str(&result).unwrap();
        let gap = parsed["later"].as_i64().unwrap() - parsed["now"].as_i64().unwrap();
        assert!((gap - 7_200_000).abs() <= 5_000, "gap was {}ms", gap);
    }

    #[test]
    fn test_lookup_document_url_parts() {
        let doc = LookupDocument::for_served_event(&ServedEvent {
            url: "/a//b/c?x=1#frag".to_string(),
            request_body: None,
            response_body: None,
        });
        assert_eq!(doc.lookup("$.urlParts[0]"), json!("a"));
        assert_eq!(doc.lookup("$.urlParts[2]"), json!("c"));
        assert_eq!(doc.lookup("$.urlParts[3]"), Value::Null);
    }

    #[test]
    fn test_lookup_document_invalid_body_is_null() {
        let doc = LookupDocument::for_served_event(&ServedEvent {
            url: "/x".to_string(),
            request_body: Some("not json".to_string()),
            response_body: Some(String::new()),
        });
        assert_eq!(doc.lookup("$.request"), Value::Null);
        assert_eq!(doc.lookup("$.response"), Value::Null);
    }
}

//! Generator options.
//!
//! [`HarSpecConfig`] is the public options surface. The data-bearing subset
//! can be loaded from a YAML file ([`HarSpecConfig::from_file`]); the
//! predicate/callback options are library-only.

use crate::har::Entry;
use crate::headers::DEFAULT_AUTH_HEADERS;
use futures::future::BoxFuture;
use regex::Regex;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// URL inclusion filter, dispatched through one awaited call regardless of
/// form.
#[derive(Clone)]
pub enum UrlFilter {
    /// Substring match against the full URL.
    Contains(String),
    /// Regex match against the full URL.
    Pattern(Regex),
    /// Synchronous predicate over (url, entry).
    Predicate(Arc<dyn Fn(&str, &Entry) -> bool + Send + Sync>),
    /// Asynchronous predicate over (url, entry).
    AsyncPredicate(Arc<dyn Fn(&str, &Entry) -> BoxFuture<'static, bool> + Send + Sync>),
}

impl UrlFilter {
    pub async fn matches(&self, url: &str, entry: &Entry) -> bool {
        match self {
            UrlFilter::Contains(needle) => url.contains(needle),
            UrlFilter::Pattern(pattern) => pattern.is_match(url),
            UrlFilter::Predicate(predicate) => predicate(url, entry),
            UrlFilter::AsyncPredicate(predicate) => predicate(url, entry).await,
        }
    }
}

impl fmt::Debug for UrlFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlFilter::Contains(needle) => f.debug_tuple("Contains").field(needle).finish(),
            UrlFilter::Pattern(pattern) => {
                f.debug_tuple("Pattern").field(&pattern.as_str()).finish()
            }
            UrlFilter::Predicate(_) => f.write_str("Predicate(..)"),
            UrlFilter::AsyncPredicate(_) => f.write_str("AsyncPredicate(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for UrlFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // config files only carry the substring form
        let needle = String::deserialize(deserializer)?;
        Ok(UrlFilter::Contains(needle))
    }
}

/// One tag-matching rule of the list form: a substring to look for in the
/// path and an optional explicit tag name. Without a name, the capitalized
/// pattern is the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub pattern: String,
    pub name: Option<String>,
}

/// Tag derivation rules: an ordered first-match-wins rule list or a
/// callback returning every tag for a path.
#[derive(Clone)]
pub enum TagRules {
    List(Vec<TagRule>),
    Callback(Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>),
}

impl fmt::Debug for TagRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRules::List(rules) => f.debug_tuple("List").field(rules).finish(),
            TagRules::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for TagRules {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RulesVisitor;

        impl<'de> Visitor<'de> for RulesVisitor {
            type Value = TagRules;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of tag rules (string or [pattern, name])")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum RawRule {
                    Pattern(String),
                    Pair(Vec<String>),
                }

                let mut rules = Vec::new();
                while let Some(raw) = seq.next_element::<RawRule>()? {
                    match raw {
                        RawRule::Pattern(pattern) => rules.push(TagRule {
                            pattern,
                            name: None,
                        }),
                        RawRule::Pair(mut parts) => {
                            if parts.is_empty() {
                                return Err(de::Error::custom("empty tag rule"));
                            }
                            let name = if parts.len() > 1 {
                                Some(parts.remove(1))
                            } else {
                                None
                            };
                            rules.push(TagRule {
                                pattern: parts.remove(0),
                                name,
                            });
                        }
                    }
                }
                Ok(TagRules::List(rules))
            }
        }

        deserializer.deserialize_seq(RulesVisitor)
    }
}

/// Options recognized by the generator. All defaults match the documented
/// behavior: standard-header filtering on, relaxed JSON parsing on,
/// authentication-header guessing on, everything else off.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarSpecConfig {
    /// Collapse every entry into a single document instead of grouping by
    /// hostname.
    pub force_all_requests_in_same_spec: bool,
    /// Seed the security-header set with the built-in auth header names.
    pub guess_authentication_headers: bool,
    /// Additional header names treated as authentication signals
    /// (case-insensitive).
    pub security_headers: Vec<String>,
    /// Drop conventional HTTP headers from parameters and response headers.
    pub filter_standard_headers: bool,
    /// Response MIME allowlist; entries whose response type is present and
    /// not listed are skipped. A missing response passes.
    pub mime_types: Option<Vec<String>>,
    /// Status codes whose request/response bodies are ignored.
    pub ignore_bodies_for_status_codes: Vec<u16>,
    /// Regex search/replace rewrites applied to every path.
    pub path_replace: BTreeMap<String, String>,
    /// Accept non-standard HTTP methods instead of skipping their entries.
    pub relaxed_methods: bool,
    /// Attempt JSON parsing for binary-ish content types before falling
    /// back to a binary schema.
    pub relaxed_content_type_json_parse: bool,
    /// Rewrite identifier-like path segments into `{name}` placeholders.
    pub attempt_to_parameterize_url: bool,
    /// Minimum digit count for a numeric segment to become `{id}`.
    pub min_length_for_numeric_path: usize,
    /// Drop paths whose operations never saw a 2xx response.
    pub drop_paths_without_successful_response: bool,
    /// Attach raw-text examples to non-JSON response bodies.
    pub include_non_json_example_responses: bool,
    /// Log entry-level degradations at warn level.
    pub log_errors: bool,
    /// URL inclusion filter; entries not matching are skipped.
    pub url_filter: Option<UrlFilter>,
    /// Tag derivation rules.
    pub tags: Option<TagRules>,
}

impl Default for HarSpecConfig {
    fn default() -> Self {
        HarSpecConfig {
            force_all_requests_in_same_spec: false,
            guess_authentication_headers: true,
            security_headers: Vec::new(),
            filter_standard_headers: true,
            mime_types: None,
            ignore_bodies_for_status_codes: Vec::new(),
            path_replace: BTreeMap::new(),
            relaxed_methods: false,
            relaxed_content_type_json_parse: true,
            attempt_to_parameterize_url: false,
            min_length_for_numeric_path: 3,
            drop_paths_without_successful_response: false,
            include_non_json_example_responses: false,
            log_errors: false,
            url_filter: None,
            tags: None,
        }
    }
}

impl HarSpecConfig {
    /// Load the data-bearing options from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: HarSpecConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// The resolved security-header set: configured names lowercased and
    /// deduplicated, with the built-in auth headers appended when guessing
    /// is enabled.
    pub(crate) fn resolved_security_headers(&self) -> HashSet<String> {
        let mut headers: HashSet<String> = self
            .security_headers
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        if self.guess_authentication_headers {
            headers.extend(DEFAULT_AUTH_HEADERS.iter().map(|name| name.to_string()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filter_forms_dispatch_through_one_call() {
        let entry = Entry {
            request: crate::har::Request::default(),
            response: None,
        };
        let contains = UrlFilter::Contains("example.com".to_string());
        assert!(contains.matches("http://example.com/x", &entry).await);
        assert!(!contains.matches("http://other.com/x", &entry).await);

        let pattern = UrlFilter::Pattern(Regex::new(r"example\.com").unwrap());
        assert!(pattern.matches("http://example.com/x", &entry).await);

        let predicate = UrlFilter::Predicate(Arc::new(|url, _| url.contains("example.com")));
        assert!(predicate.matches("http://example.com/x", &entry).await);

        let async_predicate = UrlFilter::AsyncPredicate(Arc::new(|url, _| {
            let url = url.to_string();
            let matched: BoxFuture<'static, bool> =
                Box::pin(async move { url.contains("example.com") });
            matched
        }));
        assert!(async_predicate.matches("http://example.com/x", &entry).await);
    }

    #[test]
    fn defaults_match_documented_behavior() {
        let config = HarSpecConfig::default();
        assert!(config.filter_standard_headers);
        assert!(config.relaxed_content_type_json_parse);
        assert!(config.guess_authentication_headers);
        assert!(!config.force_all_requests_in_same_spec);
        assert!(!config.attempt_to_parameterize_url);
        assert_eq!(config.min_length_for_numeric_path, 3);
    }

    #[test]
    fn security_headers_are_lowercased_and_seeded() {
        let config = HarSpecConfig {
            security_headers: vec!["X-Auth-Token".to_string(), "x-auth-token".to_string()],
            ..HarSpecConfig::default()
        };
        let resolved = config.resolved_security_headers();
        assert!(resolved.contains("x-auth-token"));
        assert!(resolved.contains("authorization"));
        assert!(resolved.contains("cookie"));

        let unguessed = HarSpecConfig {
            guess_authentication_headers: false,
            security_headers: vec!["X-Auth-Token".to_string()],
            ..HarSpecConfig::default()
        };
        let resolved = unguessed.resolved_security_headers();
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains("x-auth-token"));
    }

    #[test]
    fn options_deserialize_from_yaml() {
        let config: HarSpecConfig = serde_yaml::from_str(
            r#"
attemptToParameterizeUrl: true
minLengthForNumericPath: 4
urlFilter: example.com
mimeTypes:
  - application/json
tags:
  - login
  - [users, User Management]
"#,
        )
        .unwrap();
        assert!(config.attempt_to_parameterize_url);
        assert_eq!(config.min_length_for_numeric_path, 4);
        assert!(matches!(config.url_filter, Some(UrlFilter::Contains(ref s)) if s == "example.com"));
        assert_eq!(
            config.mime_types,
            Some(vec!["application/json".to_string()])
        );
        match config.tags {
            Some(TagRules::List(ref rules)) => {
                assert_eq!(rules.len(), 2);
                assert_eq!(rules[0].pattern, "login");
                assert_eq!(rules[0].name, None);
                assert_eq!(rules[1].pattern, "users");
                assert_eq!(rules[1].name.as_deref(), Some("User Management"));
            }
            other => panic!("unexpected tag rules: {other:?}"),
        }
    }
}

//! Path/operation key derivation: stable operation ids, human-readable
//! summaries, and tag assignment.

use crate::config::TagRules;
use crate::openapi::Operation;
use crate::text::{capitalize, pluralize, singularize};
use std::collections::{BTreeMap, HashMap};

const STANDARD_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Whether `method` (lowercase) is one of the standard HTTP verbs.
pub(crate) fn is_standard_method(method: &str) -> bool {
    !method.is_empty() && STANDARD_METHODS.contains(&method.to_ascii_lowercase().as_str())
}

/// Stable operation id: path stripped of outer slashes and parameter
/// braces, slashes replaced with dashes, prefixed with the method.
/// `post` + `/users/{id}/posts/` becomes `post-users-id-posts`.
pub(crate) fn operation_id(method: &str, path: &str) -> String {
    let stripped: String = path
        .trim_matches('/')
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect();
    format!("{method}-{}", stripped.replace('/', "-"))
}

/// Best-effort natural-language summary for an operation.
///
/// Inspects the second-to-last path segment: `login`/`logout` short-circuit
/// to fixed phrases, an `_id`-style segment produces noun phrasing keyed by
/// method, anything else falls back to pluralized-noun phrasing. Never
/// empty; "SUMMARY" is the terminal fallback.
pub(crate) fn derive_summary(method: &str, path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    let last_param = if parts.len() > 1 {
        parts[parts.len() - 2]
    } else {
        ""
    };
    let last_last_param = if parts.len() > 3 {
        parts[parts.len() - 4]
    } else {
        ""
    };

    match last_param {
        "login" => return "Log in".to_string(),
        "logout" => return "Log out".to_string(),
        _ => {}
    }

    if last_param.contains("_id") {
        let noun: String = last_param
            .chars()
            .filter(|c| *c != '{' && *c != '}')
            .collect::<String>()
            .replace("_id", "");
        match method {
            "get" => return format!("{} details", capitalize(&noun)),
            "post" => return format!("Create {noun}"),
            "patch" | "put" => return format!("Update {noun}"),
            "delete" => return format!("Delete {noun}"),
            _ => {}
        }
    }

    let qualifier = singularize(last_last_param);
    let spacer = if last_last_param.is_empty() { "" } else { " " };
    match method {
        "get" => format!("List {qualifier}{spacer}{}", pluralize(last_param)),
        "post" => format!("Create {qualifier}{spacer}{}", singularize(last_param)),
        "put" | "patch" => format!("Update {qualifier}{spacer}{}", pluralize(last_param)),
        "delete" => format!("Delete {qualifier}{spacer}{}", pluralize(last_param)),
        _ => "SUMMARY".to_string(),
    }
}

/// Tags for a path, per the configured rules. List rules are
/// first-match-wins; a callback contributes every tag it returns. `None`
/// when nothing matches, so no `tags` field is emitted at all.
pub(crate) fn derive_tags(path: &str, rules: Option<&TagRules>) -> Option<Vec<String>> {
    match rules? {
        TagRules::List(rules) => rules.iter().find(|rule| path.contains(&rule.pattern)).map(
            |rule| {
                vec![rule
                    .name
                    .clone()
                    .unwrap_or_else(|| capitalize(&rule.pattern))]
            },
        ),
        TagRules::Callback(callback) => {
            let tags = callback(path);
            if tags.is_empty() {
                None
            } else {
                Some(tags)
            }
        }
    }
}

/// Fresh operation skeleton for a (path, method) pair.
pub(crate) fn build_operation(method: &str, path: &str, tags: Option<&TagRules>) -> Operation {
    Operation {
        operation_id: operation_id(method, path),
        summary: derive_summary(method, path),
        description: String::new(),
        parameters: Vec::new(),
        responses: BTreeMap::new(),
        tags: derive_tags(path, tags),
        security: None,
        request_body: None,
        request_examples: Vec::new(),
        response_examples: HashMap::new(),
    }
}

//! Spec assembly: group capture entries by domain, drive the per-entry
//! pipeline, and finalize one document per qualifying domain.
//!
//! Per-entry failures are collected, never propagated: one bad entry must
//! not abort a domain, and one bad domain must not abort the run.

use crate::body::{mime_essence, BodySynthesizer};
use crate::config::HarSpecConfig;
use crate::error::EntryError;
use crate::har::{decode_base64_bodies, Entry, Har, Header};
use crate::headers::is_standard_header;
use crate::openapi::{
    empty_spec, Components, OpenApiSpec, Operation, Parameter, ParameterLocation, PathItem,
    SecurityScheme, Server,
};
use crate::operation::{build_operation, is_standard_method};
use crate::parameterize::parameterize_path;
use crate::response::default_response;
use crate::schema::{DerefAdapter, SchemaAdapter, SchemaInferencer, StructuralInferencer};
use crate::security;
use crate::text::schema_for_value;
use chrono::Utc;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_TITLE: &str = "Harspec";

/// One synthesized document: the structured spec, its YAML rendering, and
/// the domain it was grouped under (absent for the placeholder document).
#[derive(Debug, Clone)]
pub struct HarSpec {
    pub spec: OpenApiSpec,
    pub yaml: String,
    pub domain: Option<String>,
}

/// The synthesis engine. Holds resolved configuration and the schema
/// collaborators; one instance can process any number of captures.
pub struct SpecGenerator {
    config: HarSpecConfig,
    security_headers: HashSet<String>,
    path_rewrites: Vec<(Regex, String)>,
    inferencer: Arc<dyn SchemaInferencer>,
    adapter: Arc<dyn SchemaAdapter>,
}

impl SpecGenerator {
    pub fn new(config: HarSpecConfig) -> Self {
        let security_headers = config.resolved_security_headers();
        let path_rewrites = config
            .path_replace
            .iter()
            .filter_map(|(pattern, replacement)| match Regex::new(pattern) {
                Ok(regex) => Some((regex, replacement.clone())),
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "ignoring invalid path replace pattern");
                    None
                }
            })
            .collect();
        SpecGenerator {
            config,
            security_headers,
            path_rewrites,
            inferencer: Arc::new(StructuralInferencer),
            adapter: Arc::new(DerefAdapter),
        }
    }

    /// Replace the built-in schema inferencer.
    pub fn with_inferencer(mut self, inferencer: Arc<dyn SchemaInferencer>) -> Self {
        self.inferencer = inferencer;
        self
    }

    /// Replace the built-in schema adapter.
    pub fn with_adapter(mut self, adapter: Arc<dyn SchemaAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Synthesize one document per qualifying domain. Never fails: an
    /// empty or fully-degraded capture yields an empty list.
    pub async fn generate_all(&self, mut har: Har) -> Vec<HarSpec> {
        if har.log.entries.is_empty() {
            return Vec::new();
        }
        decode_base64_bodies(&mut har);

        let groups = self.group_entries(har.log.entries);
        let mut specs = Vec::new();
        for (domain, entries) in &groups {
            if let Some(spec) = self.build_domain(domain, entries).await {
                specs.push(spec);
            }
        }
        specs
    }

    /// Synthesize the primary domain's document, falling back to a
    /// placeholder document when no domain qualifies.
    pub async fn generate(&self, har: Har) -> HarSpec {
        let mut specs = self.generate_all(har).await;
        if !specs.is_empty() {
            return specs.remove(0);
        }
        let spec = empty_spec(format!("{DEFAULT_TITLE} - no valid specs found"));
        let yaml = serde_yaml::to_string(&spec).unwrap_or_default();
        HarSpec {
            spec,
            yaml,
            domain: None,
        }
    }

    /// Partition entries by request hostname, preserving first-seen group
    /// order. Entries with unparseable URLs are logged and skipped.
    fn group_entries(&self, entries: Vec<Entry>) -> Vec<(String, Vec<Entry>)> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Entry>> = HashMap::new();
        for entry in entries {
            let key = if self.config.force_all_requests_in_same_spec {
                "spec".to_string()
            } else {
                let host = Url::parse(&entry.request.url)
                    .ok()
                    .and_then(|url| url.host_str().map(str::to_string));
                match host {
                    Some(host) => host,
                    None => {
                        if self.config.log_errors {
                            warn!(url = %entry.request.url, "skipping entry with unparseable url");
                        } else {
                            debug!(url = %entry.request.url, "skipping entry with unparseable url");
                        }
                        continue;
                    }
                }
            };
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(entry);
        }
        order
            .into_iter()
            .filter_map(|key| groups.remove(&key).map(|entries| (key, entries)))
            .collect()
    }

    async fn build_domain(&self, domain: &str, entries: &[Entry]) -> Option<HarSpec> {
        let mut spec = empty_spec(DEFAULT_TITLE);
        spec.info.description = Some(format!(
            "OpenAPI spec generated from HAR traffic for {domain} on {}",
            Utc::now().to_rfc3339()
        ));

        let first_url = entries
            .first()
            .map(|entry| entry.request.url.clone())
            .unwrap_or_default();

        let mut schemes: BTreeMap<String, SecurityScheme> = BTreeMap::new();
        let mut entry_errors: Vec<EntryError> = Vec::new();
        for entry in entries {
            if let Err(err) = self.process_entry(&mut spec, &mut schemes, entry).await {
                if self.config.log_errors {
                    warn!(domain, error = %err, "skipping entry");
                } else {
                    debug!(domain, error = %err, "skipping entry");
                }
                entry_errors.push(err);
            }
        }
        if !entry_errors.is_empty() {
            debug!(domain, skipped = entry_errors.len(), "entries degraded during assembly");
        }

        if self.config.drop_paths_without_successful_response {
            spec.paths.retain(|_, item| {
                item.operations.iter().any(|(method, operation)| {
                    is_standard_method(method)
                        && operation.responses.keys().any(|status| status.starts_with('2'))
                })
            });
        }
        if spec.paths.is_empty() {
            return None;
        }

        if !schemes.is_empty() {
            spec.components = Some(Components {
                security_schemes: schemes,
            });
        }

        // examples are synthesis scratch space, never output
        for item in spec.paths.values_mut() {
            for operation in item.operations.values_mut() {
                operation.request_examples.clear();
                operation.response_examples.clear();
            }
        }

        let labeled = Url::parse(&first_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| domain.to_string());
        let scheme = if first_url.starts_with("https://") {
            "https://"
        } else {
            "http://"
        };
        spec.servers = vec![Server {
            url: format!("{scheme}{labeled}"),
        }];

        match serde_yaml::to_string(&spec) {
            Ok(yaml) => Some(HarSpec {
                spec,
                yaml,
                domain: Some(labeled),
            }),
            Err(err) => {
                if self.config.log_errors {
                    warn!(domain, error = %err, "failed to render document");
                } else {
                    debug!(domain, error = %err, "failed to render document");
                }
                None
            }
        }
    }

    async fn process_entry(
        &self,
        spec: &mut OpenApiSpec,
        schemes: &mut BTreeMap<String, SecurityScheme>,
        entry: &Entry,
    ) -> Result<(), EntryError> {
        let raw_url = entry.request.url.as_str();
        if raw_url.is_empty() {
            return Ok(());
        }
        let mut url = Url::parse(raw_url).map_err(|source| EntryError::InvalidUrl {
            url: raw_url.to_string(),
            source,
        })?;

        if !self.path_rewrites.is_empty() {
            let mut rewritten = url.path().to_string();
            for (pattern, replacement) in &self.path_rewrites {
                rewritten = pattern
                    .replace_all(&rewritten, replacement.as_str())
                    .into_owned();
            }
            url.set_path(&rewritten);
        }
        let mut url_path = url.path().to_string();

        let mut path_params: Vec<Parameter> = Vec::new();
        if self.config.attempt_to_parameterize_url {
            let parameterized =
                parameterize_path(&url_path, self.config.min_length_for_numeric_path);
            url_path = parameterized.path;
            path_params = parameterized.parameters;
        }

        if let Some(filter) = &self.config.url_filter {
            if !filter.matches(url.as_str(), entry).await {
                return Ok(());
            }
        }

        let response_mime = entry
            .response
            .as_ref()
            .and_then(|response| response.content.as_ref())
            .and_then(|content| content.mime_type.as_deref());
        let mime_allowed = match (&self.config.mime_types, response_mime) {
            (None, _) => true,
            // a missing response does not fail the allowlist check
            (Some(_), None) => true,
            (Some(allowed), Some(mime)) => {
                let essence = mime_essence(mime);
                allowed
                    .iter()
                    .any(|candidate| mime_essence(candidate) == essence)
            }
        };
        if !mime_allowed {
            return Ok(());
        }

        let method = entry.request.method.to_ascii_lowercase();
        if method.is_empty() {
            return Ok(());
        }
        if !self.config.relaxed_methods && !is_standard_method(&method) {
            return Ok(());
        }

        let path_item = spec
            .paths
            .entry(url_path.clone())
            .or_insert_with(|| PathItem {
                parameters: path_params,
                operations: BTreeMap::new(),
            });
        let operation = path_item
            .operations
            .entry(method.clone())
            .or_insert_with(|| build_operation(&method, &url_path, self.config.tags.as_ref()));

        let status = entry
            .response
            .as_ref()
            .map(|response| response.status)
            .unwrap_or(0);
        if status != 0 {
            operation
                .responses
                .entry(status.to_string())
                .or_insert_with(|| default_response(status, &method));
        }

        if !self.security_headers.is_empty() && !entry.request.headers.is_empty() {
            if let Some(signal) = security::classify(
                &entry.request.headers,
                &entry.request.cookies,
                &self.security_headers,
            ) {
                for scheme in &signal.header_schemes {
                    schemes
                        .entry(scheme.clone())
                        .or_insert_with(|| SecurityScheme::api_key_header(scheme.clone()));
                }
                for (scheme, cookie_name) in &signal.cookie_schemes {
                    schemes
                        .entry(scheme.clone())
                        .or_insert_with(|| SecurityScheme::api_key_cookie(cookie_name.clone()));
                }
                if operation.security.is_none() {
                    operation.security = Some(vec![signal.requirement()]);
                }
            }
        }

        let declared_query = entry.request.query_string.iter().map(|param| {
            let value = urlencoding::decode(&param.value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| param.value.clone());
            (param.name.clone(), value)
        });
        merge_query_params(operation, declared_query);
        // defensive re-derivation from the URL for malformed captures
        let rederived: Vec<(String, String)> = url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        merge_query_params(operation, rederived);

        if !entry.request.headers.is_empty() {
            self.merge_header_params(operation, &entry.request.headers);
        }

        let ignore_body = status != 0
            && self
                .config
                .ignore_bodies_for_status_codes
                .contains(&status);
        let synthesizer = BodySynthesizer {
            config: &self.config,
            inferencer: self.inferencer.as_ref(),
            adapter: self.adapter.as_ref(),
        };

        if !ignore_body {
            if let Some(post) = &entry.request.post_data {
                let mut corpus = std::mem::take(&mut operation.request_examples);
                let body = synthesizer
                    .request_body(post, &url_path, &method, &mut corpus)
                    .await;
                operation.request_examples = corpus;
                if let Some(body) = body {
                    operation.request_body = Some(body);
                }
            }
        }

        if let Some(response) = &entry.response {
            if status != 0 && !ignore_body {
                let status_key = status.to_string();
                let description = operation
                    .responses
                    .get(&status_key)
                    .map(|existing| existing.description.clone())
                    .unwrap_or_else(|| default_response(status, &method).description);
                let mut corpus = operation
                    .response_examples
                    .remove(&status_key)
                    .unwrap_or_default();
                let body = synthesizer
                    .response_body(response, &url_path, &method, description, &mut corpus)
                    .await;
                operation.response_examples.insert(status_key.clone(), corpus);
                if let Some(body) = body {
                    operation.responses.insert(status_key, body);
                }
            }
        }

        Ok(())
    }

    fn merge_header_params(&self, operation: &mut Operation, headers: &[Header]) {
        for header in headers {
            let name = header.name.trim();
            if name.is_empty() {
                continue;
            }
            if self.config.filter_standard_headers && is_standard_header(name) {
                continue;
            }
            let exists = operation
                .parameters
                .iter()
                .any(|param| param.location == ParameterLocation::Header && param.name == name);
            if exists {
                continue;
            }
            operation.parameters.push(Parameter {
                name: name.to_string(),
                location: ParameterLocation::Header,
                description: None,
                required: false,
                schema: Some(schema_for_value(&header.value)),
            });
        }
    }
}

/// Merge query parameters into an operation, never duplicating a name.
fn merge_query_params<I>(operation: &mut Operation, params: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, value) in params {
        if name.is_empty() {
            continue;
        }
        let exists = operation
            .parameters
            .iter()
            .any(|param| param.location == ParameterLocation::Query && param.name == name);
        if exists {
            continue;
        }
        operation.parameters.push(Parameter {
            name: name.clone(),
            location: ParameterLocation::Query,
            description: Some(name),
            required: false,
            schema: Some(schema_for_value(&value)),
        });
    }
}

/// Synthesize one document per qualifying domain of the capture.
pub async fn generate_specs(har: Har, config: HarSpecConfig) -> Vec<HarSpec> {
    SpecGenerator::new(config).generate_all(har).await
}

/// Synthesize the primary domain's document (placeholder when none
/// qualifies).
pub async fn generate_spec(har: Har, config: HarSpecConfig) -> HarSpec {
    SpecGenerator::new(config).generate(har).await
}

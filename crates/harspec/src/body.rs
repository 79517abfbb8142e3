//! Body synthesis: classify a payload's MIME essence, accumulate JSON
//! examples per operation/status, and produce request/response body
//! descriptors backed by the schema collaborators.
//!
//! A single malformed payload never fails the enclosing operation: parse
//! failures drop or degrade that body only, and collaborator failures fall
//! back to a permissive string schema.

use crate::config::HarSpecConfig;
use crate::har::{decoded_text, Header, PostData, PostParam, Response};
use crate::headers::is_standard_header;
use crate::openapi::{HeaderObject, MediaType, ParamSchema, RequestBody, ResponseObject};
use crate::schema::{AdapterOptions, SchemaAdapter, SchemaInferencer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Binary subtypes that never carry an inferable structure.
const BINARY_SUBTYPES: &[&str] = &[
    "octet-stream",
    "pdf",
    "zip",
    "gzip",
    "x-tar",
    "x-7z-compressed",
    "x-rar-compressed",
    "msword",
    "vnd.ms-excel",
    "vnd.ms-powerpoint",
    "vnd.openxmlformats-officedocument.wordprocessingml.document",
    "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// MIME essence: type/subtype, lowercased, parameters stripped.
pub(crate) fn mime_essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_ascii_lowercase()
}

/// The subtype of an essence, falling back to the whole string when there
/// is no slash.
fn subtype(essence: &str) -> &str {
    let mut parts = essence.split('/');
    let first = parts.next().unwrap_or(essence);
    parts.next().unwrap_or(first)
}

fn is_binary_essence(essence: &str, sub: &str) -> bool {
    essence.starts_with("image/")
        || essence.starts_with("audio/")
        || essence.starts_with("video/")
        || essence.starts_with("font/")
        || BINARY_SUBTYPES.contains(&sub)
}

/// Fallback request body for a payload with no recorded text: some file
/// was likely uploaded.
fn multipart_fallback() -> RequestBody {
    let mut content = BTreeMap::new();
    content.insert(
        "multipart/form-data".to_string(),
        MediaType {
            schema: Some(json!({
                "type": "object",
                "properties": {
                    "filename": {
                        "description": "",
                        "format": "binary",
                        "type": "string"
                    }
                }
            })),
            example: None,
        },
    );
    RequestBody {
        required: true,
        content,
    }
}

/// Flat object schema for a form-encoded payload: fields come from the
/// declared parameter list, or from parsing the raw text as a query string
/// when no list was recorded. Every observed field is required; empty and
/// `(binary)` values are binary-formatted strings.
fn form_schema(params: Option<&[PostParam]>, text: Option<&str>) -> Value {
    let mut fields: Vec<(String, String)> = Vec::new();
    match params {
        Some(params) if !params.is_empty() => {
            for param in params {
                fields.push((param.name.clone(), param.value.clone().unwrap_or_default()));
            }
        }
        _ => {
            if let Some(text) = text {
                for (name, value) in url::form_urlencoded::parse(text.as_bytes()) {
                    fields.push((name.into_owned(), value.into_owned()));
                }
            }
        }
    }
    if fields.is_empty() {
        return json!({});
    }

    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();
    for (name, value) in fields {
        let schema = if value.is_empty() || value == "(binary)" {
            json!({ "type": "string", "format": "binary" })
        } else {
            json!({ "type": "string" })
        };
        if !required.iter().any(|existing| existing == &name) {
            required.push(name.clone());
        }
        properties.insert(name, schema);
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

/// Per-generator view over the body pipeline: configuration plus the two
/// schema collaborators.
pub(crate) struct BodySynthesizer<'a> {
    pub config: &'a HarSpecConfig,
    pub inferencer: &'a dyn SchemaInferencer,
    pub adapter: &'a dyn SchemaAdapter,
}

impl BodySynthesizer<'_> {
    /// Synthesize the request body descriptor for one observed payload,
    /// accumulating its JSON example into `corpus`.
    pub async fn request_body(
        &self,
        post: &PostData,
        url_path: &str,
        method: &str,
        corpus: &mut Vec<String>,
    ) -> Option<RequestBody> {
        let mime = post.mime_type.as_deref()?;
        if post.text.is_none() {
            return Some(multipart_fallback());
        }
        let type_name = format!("{url_path}-{method}-request");
        let content = self
            .content_for(
                mime,
                post.text.as_deref(),
                post.encoding.as_deref(),
                post.params.as_deref(),
                &type_name,
                corpus,
                false,
            )
            .await?;
        Some(RequestBody {
            required: true,
            content,
        })
    }

    /// Synthesize a response body descriptor, or `None` when there is
    /// nothing to say beyond the canned placeholder.
    pub async fn response_body(
        &self,
        response: &Response,
        url_path: &str,
        method: &str,
        description: String,
        corpus: &mut Vec<String>,
    ) -> Option<ResponseObject> {
        let mut content = None;
        if let Some(body) = &response.content {
            if let (Some(mime), Some(_)) = (body.mime_type.as_deref(), body.text.as_deref()) {
                let type_name = format!("{url_path}-{method}-response");
                content = self
                    .content_for(
                        mime,
                        body.text.as_deref(),
                        body.encoding.as_deref(),
                        None,
                        &type_name,
                        corpus,
                        self.config.include_non_json_example_responses,
                    )
                    .await;
            }
        }

        let headers = self.response_headers(&response.headers);
        if content.is_none() && headers.is_empty() {
            return None;
        }
        Some(ResponseObject {
            description,
            content: content.unwrap_or_default(),
            headers,
        })
    }

    /// MIME-essence dispatch shared by requests and responses.
    async fn content_for(
        &self,
        mime: &str,
        text: Option<&str>,
        encoding: Option<&str>,
        params: Option<&[PostParam]>,
        type_name: &str,
        corpus: &mut Vec<String>,
        attach_raw_example: bool,
    ) -> Option<BTreeMap<String, MediaType>> {
        let essence = mime_essence(mime);
        let sub = subtype(&essence);

        if sub == "form-data" || sub == "x-www-form-urlencoded" {
            let mut content = BTreeMap::new();
            content.insert(
                essence,
                MediaType {
                    schema: Some(form_schema(params, text)),
                    example: None,
                },
            );
            return Some(content);
        }

        let decoded = decoded_text(text, encoding)?;
        let json_declared = sub.contains("json");
        let parsed = if json_declared || self.config.relaxed_content_type_json_parse {
            serde_json::from_str::<Value>(&decoded).ok()
        } else {
            None
        };

        if is_binary_essence(&essence, sub) {
            if let Some(value) = parsed {
                return Some(self.json_content(essence, value, type_name, corpus).await);
            }
            let mut content = BTreeMap::new();
            content.insert(
                essence,
                MediaType {
                    schema: Some(json!({ "type": "string", "format": "binary" })),
                    example: attach_raw_example.then(|| Value::String(decoded)),
                },
            );
            return Some(content);
        }

        match parsed {
            Some(value) => Some(self.json_content(essence, value, type_name, corpus).await),
            // a declared-JSON body that does not parse is dropped
            None if json_declared => None,
            None => {
                let mut content = BTreeMap::new();
                content.insert(
                    essence,
                    MediaType {
                        schema: Some(json!({ "type": "string" })),
                        example: attach_raw_example.then(|| Value::String(decoded)),
                    },
                );
                Some(content)
            }
        }
    }

    /// Accumulate one parsed JSON payload and re-synthesize the schema from
    /// the whole corpus, so the result reflects the union of every distinct
    /// example seen so far.
    async fn json_content(
        &self,
        essence: String,
        value: Value,
        type_name: &str,
        corpus: &mut Vec<String>,
    ) -> BTreeMap<String, MediaType> {
        let canonical = value.to_string();
        if !corpus.iter().any(|existing| existing == &canonical) {
            corpus.push(canonical);
        }

        let schema = match self.synthesize(type_name, corpus).await {
            Ok(schema) => schema,
            Err(err) => {
                if self.config.log_errors {
                    warn!(type_name, error = %err, "schema synthesis failed, degrading to string");
                } else {
                    debug!(type_name, error = %err, "schema synthesis failed, degrading to string");
                }
                json!({ "type": "string" })
            }
        };

        let mut content = BTreeMap::new();
        content.insert(
            essence,
            MediaType {
                schema: Some(schema),
                example: Some(value),
            },
        );
        content
    }

    async fn synthesize(
        &self,
        type_name: &str,
        corpus: &[String],
    ) -> Result<Value, crate::error::SchemaError> {
        let inferred = self.inferencer.infer(type_name, corpus).await?;
        self.adapter.adapt(inferred, &AdapterOptions::default()).await
    }

    fn response_headers(&self, headers: &[Header]) -> BTreeMap<String, HeaderObject> {
        let mut map = BTreeMap::new();
        for header in headers {
            if self.config.filter_standard_headers && is_standard_header(&header.name) {
                continue;
            }
            if header.name.is_empty() {
                continue;
            }
            map.entry(header.name.clone()).or_insert_with(|| HeaderObject {
                description: format!("Custom header {}", header.name),
                schema: ParamSchema::string(),
            });
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::har::Content;
    use crate::schema::{DerefAdapter, StructuralInferencer};

    fn synthesizer(config: &HarSpecConfig) -> BodySynthesizer<'_> {
        BodySynthesizer {
            config,
            inferencer: &StructuralInferencer,
            adapter: &DerefAdapter,
        }
    }

    fn json_post(text: &str) -> PostData {
        PostData {
            mime_type: Some("application/json".to_string()),
            text: Some(text.to_string()),
            encoding: None,
            params: None,
        }
    }

    #[tokio::test]
    async fn json_request_bodies_get_schema_and_example() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let body = synthesizer(&config)
            .request_body(
                &json_post(r#"{"user":"admin","password":"123"}"#),
                "/login",
                "post",
                &mut corpus,
            )
            .await
            .expect("body synthesized");
        assert!(body.required);
        let media = &body.content["application/json"];
        let schema = media.schema.as_ref().unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["user"]["type"], "string");
        assert_eq!(media.example.as_ref().unwrap()["user"], "admin");
        assert_eq!(corpus.len(), 1);
    }

    #[tokio::test]
    async fn distinct_payloads_accumulate_once_each() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let synth = synthesizer(&config);
        for text in [r#"{"a":1}"#, r#"{"a":"x","b":2}"#, r#"{"a":1}"#] {
            synth
                .request_body(&json_post(text), "/things", "post", &mut corpus)
                .await
                .expect("body synthesized");
        }
        assert_eq!(corpus.len(), 2);

        let body = synth
            .request_body(&json_post(r#"{"a":1}"#), "/things", "post", &mut corpus)
            .await
            .unwrap();
        let schema = body.content["application/json"].schema.as_ref().unwrap();
        assert!(schema["properties"]["a"]["anyOf"].is_array());
        assert_eq!(schema["properties"]["b"]["type"], "integer");
    }

    #[tokio::test]
    async fn declared_json_that_does_not_parse_is_dropped() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let body = synthesizer(&config)
            .request_body(&json_post("{not valid}"), "/x", "post", &mut corpus)
            .await;
        assert!(body.is_none());
        assert!(corpus.is_empty());
    }

    #[tokio::test]
    async fn base64_payloads_are_decoded_first() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let post = PostData {
            mime_type: Some("application/json".to_string()),
            text: Some("eyJ0ZXN0IjoidHJ1ZSJ9".to_string()),
            encoding: Some("base64".to_string()),
            params: None,
        };
        let body = synthesizer(&config)
            .request_body(&post, "/", "get", &mut corpus)
            .await
            .expect("body synthesized");
        let schema = body.content["application/json"].schema.as_ref().unwrap();
        assert_eq!(schema["properties"]["test"]["format"], "boolean");
    }

    #[tokio::test]
    async fn form_params_build_a_flat_object_schema() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let post = PostData {
            mime_type: Some("application/x-www-form-urlencoded".to_string()),
            text: Some("foo0=bar0&foo1=bar1".to_string()),
            encoding: None,
            params: Some(vec![
                PostParam {
                    name: "foo0".to_string(),
                    value: Some("bar0".to_string()),
                },
                PostParam {
                    name: "foo3".to_string(),
                    value: Some("bar3".to_string()),
                },
                PostParam {
                    name: "foo1".to_string(),
                    value: Some("bar1".to_string()),
                },
            ]),
        };
        let body = synthesizer(&config)
            .request_body(&post, "/login", "post", &mut corpus)
            .await
            .unwrap();
        let schema = body.content["application/x-www-form-urlencoded"]
            .schema
            .as_ref()
            .unwrap();
        assert_eq!(schema["type"], "object");
        for field in ["foo0", "foo1", "foo3"] {
            assert_eq!(schema["properties"][field]["type"], "string");
        }
        assert_eq!(schema["required"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn form_text_without_params_is_still_parsed() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let post = PostData {
            mime_type: Some("application/x-www-form-urlencoded".to_string()),
            text: Some("foo0=bar0&foo1=bar1".to_string()),
            encoding: None,
            params: None,
        };
        let body = synthesizer(&config)
            .request_body(&post, "/loginTwo", "get", &mut corpus)
            .await
            .unwrap();
        let schema = body.content["application/x-www-form-urlencoded"]
            .schema
            .as_ref()
            .unwrap();
        assert_eq!(
            schema["required"],
            json!(["foo0", "foo1"])
        );
    }

    #[tokio::test]
    async fn binary_form_fields_are_binary_strings() {
        let schema = form_schema(
            Some(&[
                PostParam {
                    name: "file".to_string(),
                    value: Some("(binary)".to_string()),
                },
                PostParam {
                    name: "empty".to_string(),
                    value: None,
                },
            ]),
            None,
        );
        assert_eq!(schema["properties"]["file"]["format"], "binary");
        assert_eq!(schema["properties"]["empty"]["format"], "binary");
    }

    #[tokio::test]
    async fn missing_text_means_a_file_upload() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let post = PostData {
            mime_type: Some("application/json".to_string()),
            text: None,
            encoding: None,
            params: None,
        };
        let body = synthesizer(&config)
            .request_body(&post, "/upload", "post", &mut corpus)
            .await
            .unwrap();
        let media = &body.content["multipart/form-data"];
        assert_eq!(
            media.schema.as_ref().unwrap()["properties"]["filename"]["format"],
            "binary"
        );
    }

    #[tokio::test]
    async fn missing_mime_type_yields_nothing() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let post = PostData {
            mime_type: None,
            text: Some("x".to_string()),
            encoding: None,
            params: None,
        };
        assert!(synthesizer(&config)
            .request_body(&post, "/", "get", &mut corpus)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn binary_responses_fall_back_without_inference() {
        let config = HarSpecConfig {
            relaxed_content_type_json_parse: false,
            ..HarSpecConfig::default()
        };
        let mut corpus = Vec::new();
        let response = Response {
            status: 200,
            headers: Vec::new(),
            content: Some(Content {
                mime_type: Some("application/pdf".to_string()),
                text: Some("%PDF-1.4".to_string()),
                encoding: None,
            }),
        };
        let body = synthesizer(&config)
            .response_body(&response, "/doc", "get", "Success".to_string(), &mut corpus)
            .await
            .unwrap();
        let media = &body.content["application/pdf"];
        assert_eq!(media.schema.as_ref().unwrap()["format"], "binary");
        assert!(media.example.is_none());
        assert!(corpus.is_empty());
    }

    #[tokio::test]
    async fn non_json_text_examples_are_opt_in() {
        let mut corpus = Vec::new();
        let response = Response {
            status: 200,
            headers: Vec::new(),
            content: Some(Content {
                mime_type: Some("text/html".to_string()),
                text: Some("<html></html>".to_string()),
                encoding: None,
            }),
        };

        let config = HarSpecConfig::default();
        let body = synthesizer(&config)
            .response_body(&response, "/", "get", "Success".to_string(), &mut corpus)
            .await
            .unwrap();
        assert!(body.content["text/html"].example.is_none());

        let config = HarSpecConfig {
            include_non_json_example_responses: true,
            ..HarSpecConfig::default()
        };
        let body = synthesizer(&config)
            .response_body(&response, "/", "get", "Success".to_string(), &mut corpus)
            .await
            .unwrap();
        assert_eq!(
            body.content["text/html"].example,
            Some(Value::String("<html></html>".to_string()))
        );
    }

    #[tokio::test]
    async fn response_headers_respect_the_denylist() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let response = Response {
            status: 200,
            headers: vec![
                Header {
                    name: "Content-Type".to_string(),
                    value: "application/json".to_string(),
                },
                Header {
                    name: "X-Request-Id".to_string(),
                    value: "abc".to_string(),
                },
            ],
            content: Some(Content {
                mime_type: Some("application/json".to_string()),
                text: Some(r#"{"ok":true}"#.to_string()),
                encoding: None,
            }),
        };
        let body = synthesizer(&config)
            .response_body(&response, "/", "get", "Success".to_string(), &mut corpus)
            .await
            .unwrap();
        assert!(body.headers.contains_key("X-Request-Id"));
        assert!(!body.headers.contains_key("Content-Type"));
        assert_eq!(
            body.headers["X-Request-Id"].description,
            "Custom header X-Request-Id"
        );

        let keep_all = HarSpecConfig {
            filter_standard_headers: false,
            ..HarSpecConfig::default()
        };
        let body = synthesizer(&keep_all)
            .response_body(&response, "/", "get", "Success".to_string(), &mut corpus)
            .await
            .unwrap();
        assert!(body.headers.contains_key("Content-Type"));
    }

    #[tokio::test]
    async fn response_without_content_or_headers_is_none() {
        let config = HarSpecConfig::default();
        let mut corpus = Vec::new();
        let response = Response {
            status: 204,
            headers: Vec::new(),
            content: None,
        };
        assert!(synthesizer(&config)
            .response_body(&response, "/", "get", "Success".to_string(), &mut corpus)
            .await
            .is_none());
    }
}

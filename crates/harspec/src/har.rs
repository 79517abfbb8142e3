//! HAR capture input model.
//!
//! Lenient deserialization of a HAR capture: every field a recorder might
//! omit is optional or defaulted, so malformed captures never fail to parse
//! at the document level. Entries are read-only input for the generator,
//! except for one up-front normalization pass that decodes base64-declared
//! response bodies in place ([`decode_base64_bodies`]).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A HAR capture document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Har {
    #[serde(default)]
    pub log: Log,
}

/// The log section of a capture: an ordered list of observed exchanges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// One observed request/response exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub request: Request,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub query_string: Vec<QueryString>,
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

/// A name/value pair as recorded (headers, query string).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryString {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cookie {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Request payload as recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<PostParam>>,
}

/// One declared form field of a request payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostParam {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Response payload as recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Decode `text` honoring a declared base64 `encoding`.
///
/// Returns `None` when there is no text at all. An undecodable base64 body
/// is returned verbatim rather than dropped.
pub(crate) fn decoded_text(text: Option<&str>, encoding: Option<&str>) -> Option<String> {
    let text = text?;
    if encoding == Some("base64") {
        match BASE64.decode(text.trim()) {
            Ok(bytes) => return Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) => {
                debug!(error = %err, "failed to decode base64 body, using raw text");
            }
        }
    }
    Some(text.to_string())
}

/// Normalization pass: decode every base64-declared response body to plain
/// text so all downstream MIME/body logic sees literal text.
pub(crate) fn decode_base64_bodies(har: &mut Har) {
    for entry in &mut har.log.entries {
        let Some(response) = entry.response.as_mut() else {
            continue;
        };
        let Some(content) = response.content.as_mut() else {
            continue;
        };
        if content.encoding.as_deref() == Some("base64") {
            content.text = decoded_text(content.text.as_deref().or(Some("")), Some("base64"));
            content.encoding = None;
        }
    }
}

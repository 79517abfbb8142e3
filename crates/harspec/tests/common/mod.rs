//! Shared fixture helpers for integration tests.

use harspec::Har;
use serde_json::{json, Value};

pub fn har_from(entries: Vec<Value>) -> Har {
    serde_json::from_value(json!({ "log": { "entries": entries } })).expect("valid har fixture")
}

pub fn get_entry(url: &str, status: u16) -> Value {
    json!({
        "request": { "method": "GET", "url": url },
        "response": {
            "status": status,
            "content": { "mimeType": "application/json", "text": "{\"ok\":true}" }
        }
    })
}

pub fn post_json_entry(url: &str, body: &str, status: u16) -> Value {
    json!({
        "request": {
            "method": "POST",
            "url": url,
            "headers": [ { "name": "Content-Type", "value": "application/json" } ],
            "postData": { "mimeType": "application/json", "text": body }
        },
        "response": {
            "status": status,
            "content": { "mimeType": "application/json", "text": "{\"ok\":true}" }
        }
    })
}

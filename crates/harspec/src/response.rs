//! Canned response descriptions keyed by status code and method semantics.

use crate::openapi::ResponseObject;

fn described(description: &str) -> ResponseObject {
    ResponseObject {
        description: description.to_string(),
        ..ResponseObject::default()
    }
}

/// Default response placeholder for an observed status code. Recorded when
/// a status is first seen for an operation; a later synthesized body
/// replaces the placeholder but keeps this description.
pub(crate) fn default_response(status: u16, method: &str) -> ResponseObject {
    match status {
        200 | 201 => match method {
            "get" => described("Success"),
            "delete" => described("Deleted"),
            "patch" => described("Updated"),
            "post" => described("Created"),
            _ => described("Success"),
        },
        304 => described("Not modified"),
        400 => match method {
            "delete" => described("Deletion failed"),
            _ => described("Bad request"),
        },
        401 => described("Unauthorized"),
        404 => described("Not found"),
        405 => described("Not allowed"),
        500..=503 => described("Server error"),
        202..=299 => match method {
            "get" => described("Success"),
            "delete" => described("Deleted"),
            "patch" => described("Updated"),
            "post" => described("Created"),
            _ => described("Unknown"),
        },
        300..=399 => described("Redirect"),
        402..=499 => described("Client error"),
        504..=599 => described("Server error"),
        _ => described("Unknown"),
    }
}

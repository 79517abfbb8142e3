//! Security classification: infer authentication signals from request
//! headers and cookies.

use crate::har::{Cookie, Header};
use crate::openapi::SecurityRequirement;
use crate::text::camelize;
use std::collections::HashSet;

/// Authentication signals found on one request.
#[derive(Debug, Clone, Default)]
pub(crate) struct SecuritySignal {
    /// Header-derived scheme names, keyed by the header's original-case
    /// name (`Authorization` maps to the fixed `JWT` scheme).
    pub header_schemes: Vec<String>,
    /// Cookie-derived (scheme name, cookie name) pairs.
    pub cookie_schemes: Vec<(String, String)>,
}

impl SecuritySignal {
    /// The single requirement object attached to an operation: every
    /// detected scheme name mapped to an empty scope list.
    pub fn requirement(&self) -> SecurityRequirement {
        let mut requirement = SecurityRequirement::new();
        for scheme in &self.header_schemes {
            requirement.insert(scheme.clone(), Vec::new());
        }
        for (scheme, _) in &self.cookie_schemes {
            requirement.insert(scheme.clone(), Vec::new());
        }
        requirement
    }
}

/// Scheme name for a cookie-based signal: `session_id` becomes
/// `cookieSessionId`.
pub(crate) fn cookie_scheme_name(cookie_name: &str) -> String {
    format!("cookie{}", camelize(cookie_name))
}

/// Inspect request headers (and cookies, when the `cookie` header is
/// flagged as a security header) for authentication signals.
///
/// `Authorization` always counts, as a bearer/JWT-style signal. Any other
/// header whose lowercased name is in `security_headers` counts under its
/// original-case name. Returns `None` when no signal is found, so callers
/// never attach an empty requirement.
pub(crate) fn classify(
    headers: &[Header],
    cookies: &[Cookie],
    security_headers: &HashSet<String>,
) -> Option<SecuritySignal> {
    let mut signal = SecuritySignal::default();
    for header in headers {
        let name = header.name.trim();
        let lowered = name.to_ascii_lowercase();
        if lowered == "authorization" {
            if !signal.header_schemes.iter().any(|s| s == "JWT") {
                signal.header_schemes.push("JWT".to_string());
            }
            continue;
        }
        if !security_headers.contains(&lowered) {
            continue;
        }
        if lowered == "cookie" {
            for cookie in cookies {
                let scheme = cookie_scheme_name(&cookie.name);
                if !signal.cookie_schemes.iter().any(|(s, _)| *s == scheme) {
                    signal.cookie_schemes.push((scheme, cookie.name.clone()));
                }
            }
        } else if !signal.header_schemes.iter().any(|s| s == name) {
            signal.header_schemes.push(name.to_string());
        }
    }

    if signal.header_schemes.is_empty() && signal.cookie_schemes.is_empty() {
        None
    } else {
        Some(signal)
    }
}

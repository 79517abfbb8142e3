//! Header tables: the standard-header denylist and the default set of
//! authentication header names used when guessing is enabled.

/// Conventional HTTP headers that carry no API-specific signal. When
/// standard-header filtering is on, these never surface as operation
/// parameters or response headers.
pub(crate) const STANDARD_HEADERS: &[&str] = &[
    "a-im",
    "accept",
    "accept-charset",
    "accept-encoding",
    "accept-language",
    "accept-ranges",
    "access-control-allow-credentials",
    "access-control-allow-headers",
    "access-control-allow-methods",
    "access-control-allow-origin",
    "access-control-expose-headers",
    "access-control-max-age",
    "access-control-request-headers",
    "access-control-request-method",
    "age",
    "allow",
    "alt-svc",
    "authorization",
    "cache-control",
    "connection",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-range",
    "content-security-policy",
    "content-type",
    "cookie",
    "date",
    "dnt",
    "etag",
    "expect",
    "expires",
    "forwarded",
    "from",
    "host",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-range",
    "if-unmodified-since",
    "keep-alive",
    "last-modified",
    "link",
    "location",
    "max-forwards",
    "origin",
    "pragma",
    "proxy-authenticate",
    "proxy-authorization",
    "public-key-pins",
    "range",
    "referer",
    "referrer-policy",
    "retry-after",
    "sec-ch-ua",
    "sec-ch-ua-mobile",
    "sec-ch-ua-platform",
    "sec-fetch-dest",
    "sec-fetch-mode",
    "sec-fetch-site",
    "sec-fetch-user",
    "server",
    "set-cookie",
    "strict-transport-security",
    "te",
    "timing-allow-origin",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "upgrade-insecure-requests",
    "user-agent",
    "vary",
    "via",
    "warning",
    "www-authenticate",
    "x-content-type-options",
    "x-frame-options",
    "x-powered-by",
    "x-requested-with",
    "x-xss-protection",
];

/// Header names treated as authentication signals when
/// `guess_authentication_headers` is enabled. Stored lowercase; matching is
/// case-insensitive against the request.
pub(crate) const DEFAULT_AUTH_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "api-key",
    "x-api-key",
    "x-access-token",
    "x-auth-token",
    "x-csrf-token",
    "x-session-id",
    "x-xsrf-token",
];

/// Case-insensitive membership in the standard-header denylist.
pub(crate) fn is_standard_header(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    STANDARD_HEADERS.contains(&lowered.as_str())
}

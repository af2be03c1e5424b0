//! Allow-list sanitization for URLs and structured property bags.
//!
//! Only explicitly permitted forms pass; everything else is rejected.
//! Rejections never raise: property sanitization degrades bad values to
//! empty strings so rendering always proceeds.

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

/// Schemes that are safe to allow. Everything else is blocked.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "sms"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafeUrl {
    #[error("empty url")]
    Empty,
    #[error("protocol-relative url resolves to a foreign origin")]
    ProtocolRelative,
    #[error("scheme `{0}` is not in the allow-list")]
    SchemeNotAllowed(String),
    #[error("malformed url")]
    Malformed,
}

/// Check a URL against the allow-list.
///
/// Fragment references, explicit relative paths, and root-relative paths are
/// accepted verbatim. Protocol-relative paths (`//host/...`) are rejected.
/// Absolute URLs are parsed and accepted only for allow-listed schemes;
/// unparsable input is rejected, never passed through.
pub fn sanitize_url(raw: &str) -> Result<&str, UnsafeUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UnsafeUrl::Empty);
    }
    if trimmed.starts_with('#') {
        return Ok(trimmed);
    }
    if trimmed.starts_with("./") || trimmed.starts_with("../") {
        return Ok(trimmed);
    }
    if trimmed.starts_with('/') {
        return if trimmed.starts_with("//") {
            Err(UnsafeUrl::ProtocolRelative)
        } else {
            Ok(trimmed)
        };
    }

    match Url::parse(trimmed) {
        Ok(parsed) => {
            if ALLOWED_SCHEMES.contains(&parsed.scheme()) {
                Ok(trimmed)
            } else {
                if cfg!(debug_assertions) {
                    tracing::warn!(scheme = parsed.scheme(), "blocked url with disallowed scheme");
                }
                Err(UnsafeUrl::SchemeNotAllowed(parsed.scheme().to_string()))
            }
        }
        Err(_) => Err(UnsafeUrl::Malformed),
    }
}

/// Whether a string is worth passing through `sanitize_url` at all.
///
/// Equivalent to `/^[a-z][a-z0-9+.-]*:/i`, plus protocol-relative prefixes.
pub fn looks_like_url(value: &str) -> bool {
    if value.starts_with("//") {
        return true;
    }
    let bytes = value.as_bytes();
    if !bytes.first().is_some_and(|b| b.is_ascii_alphabetic()) {
        return false;
    }
    for &b in &bytes[1..] {
        if b == b':' {
            return true;
        }
        if !(b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-')) {
            return false;
        }
    }
    false
}

/// Recursively sanitize a property bag. Total: never fails.
///
/// URL-looking string values pass through `sanitize_url`; rejected values
/// degrade to empty strings. Everything else is preserved unchanged.
pub fn sanitize_props(value: Value) -> Value {
    match value {
        Value::String(s) => {
            if looks_like_url(&s) {
                match sanitize_url(&s) {
                    Ok(safe) => Value::String(safe.to_string()),
                    Err(_) => Value::String(String::new()),
                }
            } else {
                Value::String(s)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_props).collect()),
        Value::Object(map) => Value::Object(sanitize_prop_map(map)),
        other => other,
    }
}

/// `sanitize_props` over a top-level map, preserving key order.
pub fn sanitize_prop_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key, sanitize_props(value)))
        .collect()
}

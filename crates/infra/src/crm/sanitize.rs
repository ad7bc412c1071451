//! Outbound payload scrubbing.
//!
//! The remote API rejects some padded or null-valued fields, so when
//! `sanitize_data` is enabled every outbound body is scrubbed: string
//! values are trimmed and explicit nulls are dropped from objects.

use serde_json::Value;

/// Scrub a JSON payload in place.
pub fn sanitize(value: &mut Value) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize(item);
            }
        }
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for (_, v) in map.iter_mut() {
                sanitize(v);
            }
        }
        _ => {}
    }
}

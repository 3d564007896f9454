//! Deep merge of JSON objects.
//!
//! Used to fold caller-supplied overrides into request bodies built by the
//! client (servers, keypairs, security groups).

use serde_json::{Map, Value};

/// Merge `overrides` into a copy of `base`.
///
/// For each key of `overrides`: when both sides hold an object the two are
/// merged recursively; when `base` lacks the key the override is inserted as-is;
/// otherwise the override value replaces the base value. Arrays and scalars are
/// never merged element-wise.
#[must_use]
pub fn deep_merge(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut output = base.clone();

    for (key, value) in overrides {
        let merged = match (output.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                Value::Object(deep_merge(existing, nested))
            }
            _ => value.clone(),
        };
        output.insert(key.clone(), merged);
    }

    output
}

//! Stable (canonical) serialization of structured values.
//!
//! Produces a byte image of a [`serde_json::Value`] such that semantically
//! equal values map to equal bytes: object keys are emitted in
//! lexicographic byte order, arrays preserve order, and scalar formatting
//! is delegated to `serde_json`'s canonical token forms. The image feeds
//! SHA-256 for invocation fingerprints and receipt IDs.
//!
//! `serde_json::Value` is an owned tree, so cyclic inputs are
//! unrepresentable; totality over hostile inputs is instead guaranteed by
//! a recursion-depth cap. Values nested beyond [`MAX_VALUE_DEPTH`] are
//! rejected with [`CoreError::DepthLimitExceeded`], which hashing callers
//! convert to a fixed substitute literal.

use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Maximum container nesting the stable serializer will walk.
pub const MAX_VALUE_DEPTH: usize = 128;

/// Produce the canonical byte image of a value.
///
/// # Errors
///
/// Returns [`CoreError::DepthLimitExceeded`] if containers nest beyond
/// [`MAX_VALUE_DEPTH`].
pub fn stable_bytes(value: &Value) -> CoreResult<Vec<u8>> {
    let mut out = Vec::new();
    write_value(value, 0, &mut out)?;
    Ok(out)
}

/// Produce the canonical string image of a value.
///
/// The image is valid JSON with keys sorted, suitable for previews.
///
/// # Errors
///
/// Returns [`CoreError::DepthLimitExceeded`] if containers nest beyond
/// [`MAX_VALUE_DEPTH`].
pub fn stable_string(value: &Value) -> CoreResult<String> {
    let bytes = stable_bytes(value)?;
    // The writer only emits valid JSON tokens, which are valid UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_value(value: &Value, depth: usize, out: &mut Vec<u8>) -> CoreResult<()> {
    if depth > MAX_VALUE_DEPTH {
        return Err(CoreError::DepthLimitExceeded {
            max_depth: MAX_VALUE_DEPTH,
        });
    }

    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_escaped(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, depth.saturating_add(1), out)?;
            }
            out.push(b']');
        },
        Value::Object(map) => {
            // Lexicographic byte order over keys, independent of the
            // map's own iteration order.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_escaped(key, out);
                out.push(b':');
                let child = map.get(key.as_str()).unwrap_or(&Value::Null);
                write_value(child, depth.saturating_add(1), out)?;
            }
            out.push(b'}');
        },
    }
    Ok(())
}

/// Emit a JSON-escaped string token using `serde_json`'s escaping rules.
fn write_escaped(s: &str, out: &mut Vec<u8>) {
    // Escaping a plain string cannot fail.
    match serde_json::to_vec(s) {
        Ok(bytes) => out.extend_from_slice(&bytes),
        Err(_) => out.extend_from_slice(b"\"\""),
    }
}

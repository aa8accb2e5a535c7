//! Backend line protocol.
//!
//! Request: one JSON object terminated by a single `\n`.
//! Response: everything the backend writes until it closes the connection,
//! parsed as one JSON value `{"data": ...}` or `{"error": {"message", "stacktrace"?}}`.

use serde_json::Value;

use crate::{backend::types::BackendRequest, errors::Error, utils::truncate_text, Result};

pub fn encode_request(req: &BackendRequest) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(req)?;
    buf.push(b'\n');
    Ok(buf)
}

pub fn decode_response(raw: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::Protocol(format!("backend response is not UTF-8: {e}")))?;

    let value: Value = serde_json::from_str(text).map_err(|e| {
        Error::Protocol(format!(
            "backend response is not JSON: {e}: {}",
            truncate_text(text, 200)
        ))
    })?;

    let Value::Object(mut obj) = value else {
        return Err(Error::Protocol(
            "backend response is not a JSON object".to_string(),
        ));
    };

    if let Some(err) = obj.remove("error") {
        if !err.is_null() {
            return Err(backend_error(err));
        }
    }

    obj.remove("data")
        .ok_or_else(|| Error::Protocol("backend response has neither data nor error".to_string()))
}

fn backend_error(err: Value) -> Error {
    match err {
        Value::String(message) => Error::backend(message, None),
        Value::Object(obj) => {
            let message = obj
                .get("message")
                .map(value_to_text)
                .unwrap_or_else(|| "unknown backend error".to_string());
            let stacktrace = obj
                .get("stacktrace")
                .filter(|v| !v.is_null())
                .map(value_to_text);
            let removed_bot = obj
                .get("removedbot")
                .filter(|v| !v.is_null())
                .map(value_to_text);
            Error::Backend {
                message,
                stacktrace,
                removed_bot,
            }
        }
        other => Error::backend(value_to_text(&other), None),
    }
}

/// Render a JSON value for a chat reply: strings verbatim, anything else as JSON.
pub fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

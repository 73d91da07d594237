//! Response classification
//!
//! Turns the raw body of one fetch attempt into a [`PageOutcome`]. The catalog answers
//! every request with JSON, but the interesting signal is in its shape:
//!
//! | Body                                  | Outcome               |
//! |---------------------------------------|-----------------------|
//! | not JSON                              | `MalformedResponse`   |
//! | `{"rows": [..non-empty..], ...}`      | `Rows`                |
//! | `{"rows": [], ...}`                   | `EndOfStream`         |
//! | truthy `code` with `message`, no rows | `Blocked`             |
//! | anything else                         | `MalformedResponse`   |
//!
//! Transport failures never reach this module; the fetcher reports them directly.

use serde_json::Value;

use crate::types::{PageOutcome, RawRow, SearchTarget};

/// Classify a response body for the given target
///
/// Pure and total: every input maps to exactly one outcome. The target is accepted so
/// the signature stays stable if the two endpoints ever diverge in shape; today both
/// answer with the same envelope.
#[must_use]
pub fn classify(body: &str, _target: SearchTarget) -> PageOutcome {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return malformed(body),
    };

    let Some(object) = parsed.as_object() else {
        return malformed(body);
    };

    match object.get("rows") {
        Some(Value::Array(rows)) if rows.is_empty() => PageOutcome::EndOfStream,
        Some(Value::Array(rows)) => PageOutcome::Rows(rows.iter().map(as_row).collect()),
        Some(_) => malformed(body),
        None => match object.get("code") {
            Some(code) if is_truthy(code) => PageOutcome::Blocked {
                code: scalar_text(code),
                message: object.get("message").map(scalar_text).unwrap_or_default(),
            },
            _ => malformed(body),
        },
    }
}

fn malformed(body: &str) -> PageOutcome {
    PageOutcome::MalformedResponse {
        body: body.to_string(),
    }
}

// Non-object entries become empty rows; the normalizer fills their defaults
fn as_row(value: &Value) -> RawRow {
    value.as_object().cloned().unwrap_or_default()
}

// Only a truthy code signals a block; `0`, `false` and empty values do not
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Credential masking for diagnostic payloads.
//!
//! Applied to every entry before it is stored, since the log can be exported and
//! handed around as a file.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::lazy_regex;

pub const REDACTION_MASK: &str = "[REDACTED]";

static BEARER_TOKEN: LazyLock<Regex> = lazy_regex!(r#"(?i)\b(bearer)\s+[^\s"']+"#);

static SECRET_KEY: LazyLock<Regex> = lazy_regex!(r"\bsk-[A-Za-z0-9_\-]{8,}");

/// Fragments that mark a key as holding a credential, matched against the key
/// after lowercasing and dropping `-`/`_`.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "auth",
    "token",
    "secret",
    "password",
    "passwd",
    "apikey",
    "credential",
    "bearer",
    "cookie",
];

#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// Masks bearer tokens and `sk-` style keys embedded in free text.
#[must_use]
pub fn redact_text(text: &str) -> Cow<'_, str> {
    let bearer = BEARER_TOKEN.replace_all(text, format!("$1 {REDACTION_MASK}").as_str());
    if SECRET_KEY.is_match(&bearer) {
        Cow::Owned(SECRET_KEY.replace_all(&bearer, REDACTION_MASK).into_owned())
    } else {
        bearer
    }
}

/// Walks a payload, replacing credential-keyed values wholesale and scrubbing strings.
///
/// Numbers and booleans under a credential-like key are kept, so counters such
/// as `max_tokens` stay readable.
#[must_use]
pub fn redact_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if is_sensitive_key(&key)
                        && matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
                    {
                        (key, Value::String(REDACTION_MASK.to_string()))
                    } else {
                        (key, redact_value(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact_value).collect()),
        Value::String(text) => Value::String(redact_text(&text).into_owned()),
        other => other,
    }
}

//! Tolerant field decoders for model-authored JSON
//!
//! Completions follow the requested shape loosely: ids arrive as numbers,
//! flags as `"true"`, option lists as numbers. These decoders coerce what
//! has an obvious reading and fall back to the field's default otherwise,
//! so one odd member never rejects the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Text form of a scalar; `None` for null, arrays and objects
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Truthiness of a flag the model may send as bool, string or number
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "y" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Text written as any scalar (`"1"`, `1`, `true`); non-scalars become empty
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

pub(crate) fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(truthy(&Value::deserialize(deserializer)?))
}

/// A list of labels; a lone scalar counts as a one-element list
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    })
}

/// Decode the object entries of an array, dropping entries that are not objects
///
/// A value that is not an array at all decodes as `None`.
pub(crate) fn object_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "flag")]
        on: bool,
        #[serde(default, deserialize_with = "string_list")]
        items: Vec<String>,
        #[serde(default, deserialize_with = "optional_string")]
        note: Option<String>,
    }

    fn decode(value: Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ids_from_scalars() {
        assert_eq!(decode(json!({"id": 7})).id, "7");
        assert_eq!(decode(json!({"id": "a"})).id, "a");
        assert_eq!(decode(json!({"id": null})).id, "");
        assert_eq!(decode(json!({"id": [1]})).id, "");
    }

    #[test]
    fn test_flags() {
        assert!(decode(json!({"on": true})).on);
        assert!(decode(json!({"on": "TRUE"})).on);
        assert!(decode(json!({"on": "yes"})).on);
        assert!(decode(json!({"on": 1})).on);
        assert!(!decode(json!({"on": "false"})).on);
        assert!(!decode(json!({"on": null})).on);
        assert!(!decode(json!({})).on);
    }

    #[test]
    fn test_string_lists() {
        assert_eq!(decode(json!({"items": [1, "two", null, 3.5]})).items, vec!["1", "two", "3.5"]);
        assert_eq!(decode(json!({"items": "solo"})).items, vec!["solo"]);
        assert!(decode(json!({"items": {"a": 1}})).items.is_empty());
    }

    #[test]
    fn test_optional_string() {
        assert_eq!(decode(json!({"note": "hi"})).note.as_deref(), Some("hi"));
        assert_eq!(decode(json!({"note": 4})).note.as_deref(), Some("4"));
        assert!(decode(json!({"note": null})).note.is_none());
    }
}

//! Tolerant readers for oracle output.
//!
//! The oracle is asked for JSON but routinely wraps it in prose or code
//! fences, quotes numbers, or sends `null` where a string belongs. These
//! helpers take whatever shape is recoverable and leave the rest to the
//! stage fallbacks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ParseError;

/// Strip markdown code fences from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Find the first JSON object in `text` that deserializes into `T`.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let body = strip_code_blocks(text);
    let mut schema_error = None;

    for (start, _) in body.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&body[start..]).into_iter::<Value>();
        let Some(Ok(value)) = stream.next() else {
            continue;
        };
        if !value.is_object() {
            continue;
        }
        match serde_json::from_value::<T>(value) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                schema_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    match schema_error {
        Some(e) => Err(ParseError::Schema(e)),
        None => Err(ParseError::NoJson),
    }
}

fn index_from_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}

/// An index given as a number or a numeric string; anything else is `None`.
pub(crate) fn index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(index_from_value))
}

/// A list of indices; unreadable entries are kept as `None` so callers can
/// count them as invalid references.
pub(crate) fn indices<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<usize>>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().map(index_from_value).collect(),
        Some(single) => vec![index_from_value(&single)],
        None => Vec::new(),
    })
}

/// Any scalar rendered as text; `null` becomes the empty string.
pub(crate) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// A list of strings, also accepting one comma-separated string.
pub(crate) fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let list = match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    Ok(list
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "index")]
        index: Option<usize>,
        #[serde(default, deserialize_with = "text")]
        reason: String,
        #[serde(default, deserialize_with = "strings")]
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        items: Vec<Probe>,
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn test_extract_json_skips_prose() {
        let text = "Here you go:\n{\"items\": [{\"index\": 3, \"reason\": \"ok\"}]}\nThanks!";
        let parsed: Wrapper = extract_json(text).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].index, Some(3));
    }

    #[test]
    fn test_extract_json_skips_broken_leading_object() {
        let text = "{ not json } then {\"items\": []}";
        let parsed: Wrapper = extract_json(text).unwrap();
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_extract_json_reports_schema_mismatch() {
        let err = extract_json::<Wrapper>("{\"other\": 1}").unwrap_err();
        assert!(matches!(err, ParseError::Schema(_)));
    }

    #[test]
    fn test_extract_json_without_object() {
        let err = extract_json::<Wrapper>("I could not decide.").unwrap_err();
        assert!(matches!(err, ParseError::NoJson));
    }

    #[test]
    fn test_extract_json_truncated() {
        let err = extract_json::<Wrapper>("{\"items\": [{\"index\": 1").unwrap_err();
        assert!(matches!(err, ParseError::NoJson));
    }

    #[test]
    fn test_lenient_fields() {
        let parsed: Probe =
            serde_json::from_str(r#"{"index": "7", "reason": null, "tags": "a, b,, c"}"#).unwrap();
        assert_eq!(parsed.index, Some(7));
        assert_eq!(parsed.reason, "");
        assert_eq!(parsed.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lenient_index_rejects_negative_and_words() {
        let parsed: Probe = serde_json::from_str(r#"{"index": -1}"#).unwrap();
        assert_eq!(parsed.index, None);
        let parsed: Probe = serde_json::from_str(r#"{"index": "three"}"#).unwrap();
        assert_eq!(parsed.index, None);
    }
}

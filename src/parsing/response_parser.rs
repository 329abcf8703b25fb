use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::ResponseConfig;
use crate::error::{Error, Result};
use crate::types::{GeneratedItem, TokenId};

/// An entry of the response that could not become a GeneratedItem.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MalformedItem {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub items: Vec<GeneratedItem>,
    pub malformed: Vec<MalformedItem>,
}

/// Decodes the generation collaborator's JSON into GeneratedItems.
///
/// Accepts either a bare array of objects or an object holding that array under
/// `items_field`. Each object's `id_field` becomes the claimed token id and the
/// remaining fields become the content.
pub fn parse_generated_items(json: &str, config: &ResponseConfig) -> Result<ParsedResponse> {
    let document: Value = serde_json::from_str(json)
        .map_err(|e| Error::Response(format!("response is not valid JSON: {}", e)))?;

    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut root) => match root.remove(&config.items_field) {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(Error::Response(format!(
                    "'{}' is not an array",
                    config.items_field
                )))
            }
            None => {
                return Err(Error::Response(format!(
                    "response object has no '{}' array",
                    config.items_field
                )))
            }
        },
        _ => {
            return Err(Error::Response(
                "response must be an array or an object".to_string(),
            ))
        }
    };

    let mut parsed = ParsedResponse::default();
    for (position, entry) in entries.into_iter().enumerate() {
        match item_from_entry(entry, &config.id_field) {
            Ok(item) => parsed.items.push(item),
            Err(reason) => {
                warn!("Skipping generated entry {}: {}", position, reason);
                parsed.malformed.push(MalformedItem { position, reason });
            }
        }
    }
    Ok(parsed)
}

fn item_from_entry(entry: Value, id_field: &str) -> std::result::Result<GeneratedItem, String> {
    let mut fields: Map<String, Value> = match entry {
        Value::Object(fields) => fields,
        other => return Err(format!("expected an object, found {}", type_name(&other))),
    };

    let claimed_token_id = match fields.remove(id_field) {
        Some(Value::String(id)) if !id.trim().is_empty() => TokenId::from(id.trim()),
        Some(Value::Number(n)) => TokenId::from(n.to_string()),
        Some(other) => {
            return Err(format!(
                "'{}' must be a string or number, found {}",
                id_field,
                type_name(&other)
            ))
        }
        None => return Err(format!("missing '{}'", id_field)),
    };

    Ok(GeneratedItem {
        claimed_token_id,
        content: Value::Object(fields),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_array() {
        let json = r#"[{"token_id": "s1-t0", "meaning": "bridge", "reading": "はし"}]"#;
        let parsed = parse_generated_items(json, &ResponseConfig::default()).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].claimed_token_id.as_str(), "s1-t0");
        assert_eq!(
            parsed.items[0].content,
            json!({"meaning": "bridge", "reading": "はし"})
        );
        assert!(parsed.malformed.is_empty());
    }

    #[test]
    fn parses_wrapped_array_with_custom_id_field() {
        let config = ResponseConfig {
            id_field: "w_id".to_string(),
            items_field: "words".to_string(),
        };
        let json = r#"{"words": [{"w_id": 42, "m": "x"}], "exs": []}"#;
        let parsed = parse_generated_items(json, &config).unwrap();
        assert_eq!(parsed.items[0].claimed_token_id.as_str(), "42");
    }

    #[test]
    fn malformed_entries_are_collected_not_fatal() {
        let json = r#"[{"meaning": "no id"}, "loose", {"token_id": "s2-t1"}, {"token_id": null}]"#;
        let parsed = parse_generated_items(json, &ResponseConfig::default()).unwrap();
        assert_eq!(parsed.items.len(), 1);
        let positions: Vec<_> = parsed.malformed.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 1, 3]);
    }

    #[test]
    fn non_json_is_response_error() {
        let result = parse_generated_items("Sure! Here are the words:", &ResponseConfig::default());
        assert!(matches!(result, Err(Error::Response(_))));
    }

    #[test]
    fn object_without_items_is_response_error() {
        let result = parse_generated_items(r#"{"examples": []}"#, &ResponseConfig::default());
        assert!(matches!(result, Err(Error::Response(_))));
    }
}

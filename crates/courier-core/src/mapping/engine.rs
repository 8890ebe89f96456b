//! Recursive mapping interpreter
//!
//! `build_payload` renders a provider request body from canonical data;
//! `parse_response` turns a provider response back into canonical message
//! outcomes. Both walk the declarative spec, never provider-specific code.

use serde_json::{Map, Value};
use tracing::warn;

use super::spec::{
    ExtractionMode, MappingNode, MappingSpec, MessageExtraction, ResponseMapping, ScalarType,
};
use super::MappingError;
use crate::providers::{DispatchInput, MessageOutcome};

/// Look up a dotted path inside a JSON value. Path segments index into
/// objects by key and into arrays by integer position, e.g.
/// "result.messages.0.id".
pub fn lookup_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = source;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Coerce a looked-up value to its declared scalar type
fn coerce(value: &Value, ty: ScalarType, field: &str) -> Result<Value, MappingError> {
    let unparsable = |v: &Value| MappingError::Unparsable {
        field: field.to_string(),
        expected: ty.name(),
        value: v.to_string(),
    };

    match ty {
        ScalarType::String => Ok(match value {
            Value::String(s) => Value::String(s.clone()),
            Value::Null => Value::Null,
            other => Value::String(other.to_string()),
        }),
        ScalarType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => {
                if let Ok(i) = s.parse::<i64>() {
                    Ok(Value::from(i))
                } else if let Ok(f) = s.parse::<f64>() {
                    Ok(Value::from(f))
                } else {
                    Err(unparsable(value))
                }
            }
            other => Err(unparsable(other)),
        },
        // Strict: only `true` or "true" coerce to true
        ScalarType::Boolean => {
            let truthy = matches!(value, Value::Bool(true)) || value.as_str() == Some("true");
            Ok(Value::Bool(truthy))
        }
        ScalarType::Date => {
            let parsed = match value {
                Value::String(s) => parse_date(s),
                // Numeric dates are epoch seconds
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
                _ => None,
            };
            parsed
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(|| unparsable(value))
        }
    }
}

/// Parse a date string in RFC 3339 or the common provider formats
pub fn parse_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Render a payload from a mapping spec and canonical source data
pub fn build_payload(spec: &MappingSpec, source: &Value) -> Result<Value, MappingError> {
    let mut out = Map::new();

    for (key, node) in spec {
        let rendered = match node {
            MappingNode::Literal(value) => value.clone(),

            MappingNode::Field(f) => match lookup_path(source, &f.field) {
                Some(value) if !value.is_null() => coerce(value, f.value_type, &f.field)?,
                _ => f.default.clone().unwrap_or(Value::Null),
            },

            MappingNode::Array(a) => {
                let elements = match &a.field {
                    Some(path) => lookup_path(source, path),
                    None => Some(source),
                };
                match elements {
                    Some(Value::Array(items)) => {
                        let mut mapped = Vec::with_capacity(items.len());
                        for item in items {
                            mapped.push(build_payload(&a.mapping, item)?);
                        }
                        Value::Array(mapped)
                    }
                    _ => Value::Array(Vec::new()),
                }
            }

            MappingNode::Object(o) => {
                let sub = lookup_path(source, &o.field)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                build_payload(&o.mapping, &sub)?
            }
        };

        out.insert(key.clone(), rendered);
    }

    Ok(Value::Object(out))
}

/// Parse a provider response into canonical outcomes, zipping extracted
/// message shapes against the original input batch.
pub fn parse_response(
    mapping: &ResponseMapping,
    response: &Value,
    inputs: &[DispatchInput],
) -> Result<Vec<MessageOutcome>, MappingError> {
    match mapping.messages.mode {
        ExtractionMode::Object => {
            let outcome =
                build_outcome(&mapping.messages, &mapping.status_map, response, inputs.first())?;
            Ok(vec![outcome])
        }
        ExtractionMode::Array => {
            let mut sources: Vec<&Value> = Vec::new();
            for path in &mapping.messages.paths {
                match lookup_path(response, path) {
                    Some(Value::Array(items)) => sources.extend(items.iter()),
                    Some(_) | None => {}
                }
            }

            let mut outcomes = Vec::with_capacity(sources.len());
            for (index, source) in sources.into_iter().enumerate() {
                let input = inputs.get(index);
                if input.is_none() {
                    warn!(index, "provider returned more messages than inputs, skipping");
                    continue;
                }
                outcomes.push(build_outcome(
                    &mapping.messages,
                    &mapping.status_map,
                    source,
                    input,
                )?);
            }
            Ok(outcomes)
        }
    }
}

/// Build one outcome: input values as the base, mapped source fields on
/// top, then the canonical status remap.
fn build_outcome(
    extraction: &MessageExtraction,
    status_map: &std::collections::BTreeMap<String, String>,
    source: &Value,
    input: Option<&DispatchInput>,
) -> Result<MessageOutcome, MappingError> {
    let mut out = Map::new();
    out.insert("priority".into(), Value::from(1));
    out.insert("message_type".into(), Value::from("text"));
    out.insert("delivery_status".into(), Value::from("queued"));

    if let Some(input) = input {
        out.insert("id".into(), Value::String(input.id.to_string()));
        out.insert("recipient".into(), Value::String(input.recipient.clone()));
        out.insert("content".into(), Value::String(input.content.clone()));
        out.insert(
            "country_code".into(),
            Value::String(input.country_code.clone()),
        );
    }

    for (key, f) in &extraction.mapping {
        match lookup_path(source, &f.field) {
            Some(value) if !value.is_null() => {
                out.insert(key.clone(), coerce(value, f.value_type, &f.field)?);
            }
            _ => {
                if let Some(default) = &f.default {
                    out.insert(key.clone(), default.clone());
                }
                // otherwise the input-derived value (if any) stands
            }
        }
    }

    let canonical = out
        .get("status")
        .and_then(raw_status_key)
        .and_then(|raw| status_map.get(&raw).cloned())
        .unwrap_or_else(|| "unknown".to_string());
    out.insert("status".into(), Value::String(canonical));
    out.insert("provider_raw_response".into(), source.clone());

    serde_json::from_value(Value::Object(out))
        .map_err(|e| MappingError::MalformedOutcome(e.to_string()))
}

/// Render a raw status value as a remap-table key
fn raw_status_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::DispatchInput;
    use courier_common::types::MessageStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn input(recipient: &str) -> DispatchInput {
        DispatchInput {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            country_code: "57".to_string(),
            content: "hello".to_string(),
            channel: "sms".to_string(),
        }
    }

    #[test]
    fn test_lookup_path_objects_and_arrays() {
        let value = json!({ "result": { "messages": [ { "id": "abc" } ] } });
        assert_eq!(
            lookup_path(&value, "result.messages.0.id"),
            Some(&json!("abc"))
        );
        assert_eq!(lookup_path(&value, "result.missing"), None);
        assert_eq!(lookup_path(&value, "result.messages.5"), None);
    }

    #[test]
    fn test_build_payload_literals_and_fields() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "encoding": "UTF-8",
            "format": 1,
            "country": { "field": "country_code", "type": "string", "default": "57" },
            "mobile": { "field": "recipient", "type": "string" }
        }))
        .unwrap();

        let payload = build_payload(
            &spec,
            &json!({ "recipient": "3001234567" }),
        )
        .unwrap();

        assert_eq!(
            payload,
            json!({
                "encoding": "UTF-8",
                "format": 1,
                "country": "57",
                "mobile": "3001234567"
            })
        );
    }

    #[test]
    fn test_build_payload_missing_without_default_is_null() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "label": { "field": "nope", "type": "string" }
        }))
        .unwrap();

        let payload = build_payload(&spec, &json!({})).unwrap();
        assert_eq!(payload, json!({ "label": null }));
    }

    #[test]
    fn test_build_payload_number_coercion() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "count": { "field": "count", "type": "number" }
        }))
        .unwrap();

        let payload = build_payload(&spec, &json!({ "count": "42" })).unwrap();
        assert_eq!(payload, json!({ "count": 42 }));

        let err = build_payload(&spec, &json!({ "count": "forty-two" })).unwrap_err();
        assert!(matches!(err, MappingError::Unparsable { .. }));
    }

    #[test]
    fn test_build_payload_boolean_is_strict() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "flash": { "field": "flash", "type": "boolean" }
        }))
        .unwrap();

        for (raw, expected) in [
            (json!(true), true),
            (json!("true"), true),
            (json!("yes"), false),
            (json!(1), false),
        ] {
            let payload = build_payload(&spec, &json!({ "flash": raw })).unwrap();
            assert_eq!(payload["flash"], json!(expected));
        }
    }

    #[test]
    fn test_build_payload_date_coercion() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "send_at": { "field": "when", "type": "date" }
        }))
        .unwrap();

        let payload =
            build_payload(&spec, &json!({ "when": "2024-03-01 10:30:00" })).unwrap();
        assert_eq!(payload["send_at"], json!("2024-03-01T10:30:00+00:00"));

        let err = build_payload(&spec, &json!({ "when": "not a date" })).unwrap_err();
        assert!(matches!(err, MappingError::Unparsable { .. }));
    }

    #[test]
    fn test_build_payload_array_node_maps_elements() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "country": "57",
            "recipients": {
                "type": "array",
                "mapping": {
                    "mobile": { "field": "recipient", "type": "string" },
                    "text": { "field": "content", "type": "string" }
                }
            }
        }))
        .unwrap();

        let batch = json!([
            { "recipient": "300111", "content": "a" },
            { "recipient": "300222", "content": "b" }
        ]);

        let payload = build_payload(&spec, &batch).unwrap();
        assert_eq!(
            payload["recipients"],
            json!([
                { "mobile": "300111", "text": "a" },
                { "mobile": "300222", "text": "b" }
            ])
        );
    }

    #[test]
    fn test_build_payload_array_node_non_iterable_source() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "recipients": {
                "type": "array",
                "field": "contacts",
                "mapping": { "mobile": { "field": "phone", "type": "string" } }
            }
        }))
        .unwrap();

        let payload = build_payload(&spec, &json!({ "contacts": "oops" })).unwrap();
        assert_eq!(payload["recipients"], json!([]));
    }

    #[test]
    fn test_build_payload_object_node() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "auth": {
                "type": "object",
                "field": "credentials",
                "mapping": {
                    "user": { "field": "username", "type": "string" },
                    "pass": { "field": "password", "type": "string" }
                }
            }
        }))
        .unwrap();

        let payload = build_payload(
            &spec,
            &json!({ "credentials": { "username": "u", "password": "p" } }),
        )
        .unwrap();
        assert_eq!(payload["auth"], json!({ "user": "u", "pass": "p" }));
    }

    #[test]
    fn test_parse_response_object_mode() {
        let mapping: ResponseMapping = serde_json::from_value(json!({
            "messages": {
                "type": "object",
                "mapping": {
                    "provider_message_id": { "field": "sid", "type": "string" },
                    "status": { "field": "status", "type": "string" }
                }
            },
            "status_map": { "accepted": "queued", "delivered": "sent" }
        }))
        .unwrap();

        let inputs = vec![input("300111")];
        let outcomes = parse_response(
            &mapping,
            &json!({ "sid": "SM123", "status": "accepted" }),
            &inputs,
        )
        .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].id, Some(inputs[0].id));
        assert_eq!(outcomes[0].provider_message_id.as_deref(), Some("SM123"));
        assert_eq!(outcomes[0].status, MessageStatus::Queued);
        assert_eq!(outcomes[0].recipient.as_deref(), Some("300111"));
    }

    #[test]
    fn test_parse_response_array_mode_concatenates_paths() {
        let mapping: ResponseMapping = serde_json::from_value(json!({
            "messages": {
                "type": "array",
                "paths": ["result.accepted", "result.rejected"],
                "mapping": {
                    "provider_message_id": { "field": "txn", "type": "string" },
                    "status": { "field": "code", "type": "number" }
                }
            },
            "status_map": { "1": "sent", "-2": "failed" }
        }))
        .unwrap();

        let inputs = vec![input("300111"), input("300222"), input("300333")];
        let response = json!({
            "result": {
                "accepted": [
                    { "txn": "t1", "code": 1 },
                    { "txn": "t2", "code": 1 }
                ],
                "rejected": [
                    { "txn": "t3", "code": -2 }
                ]
            }
        });

        let outcomes = parse_response(&mapping, &response, &inputs).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].status, MessageStatus::Sent);
        assert_eq!(outcomes[1].status, MessageStatus::Sent);
        assert_eq!(outcomes[2].status, MessageStatus::Failed);
        assert_eq!(outcomes[2].id, Some(inputs[2].id));
        assert_eq!(outcomes[2].provider_message_id.as_deref(), Some("t3"));
    }

    #[test]
    fn test_parse_response_unmapped_status_is_unknown() {
        let mapping: ResponseMapping = serde_json::from_value(json!({
            "messages": {
                "type": "object",
                "mapping": { "status": { "field": "state", "type": "string" } }
            },
            "status_map": { "ok": "sent" }
        }))
        .unwrap();

        let inputs = vec![input("300111")];
        let outcomes =
            parse_response(&mapping, &json!({ "state": "whatever" }), &inputs).unwrap();
        assert_eq!(outcomes[0].status, MessageStatus::Unknown);
    }

    #[test]
    fn test_request_response_roundtrip_preserves_declared_fields() {
        // Symmetric config: the request writes the fields the response reads.
        let request: MappingSpec = serde_json::from_value(json!({
            "to": { "field": "recipient", "type": "string" },
            "body": { "field": "content", "type": "string" },
            "status": "ok"
        }))
        .unwrap();
        let response: ResponseMapping = serde_json::from_value(json!({
            "messages": {
                "type": "object",
                "mapping": {
                    "recipient": { "field": "to", "type": "string" },
                    "content": { "field": "body", "type": "string" },
                    "status": { "field": "status", "type": "string" }
                }
            },
            "status_map": { "ok": "sent" }
        }))
        .unwrap();

        let one = input("300777");
        let echoed = build_payload(
            &request,
            &serde_json::to_value(&one).unwrap(),
        )
        .unwrap();
        let outcomes = parse_response(&response, &echoed, &[one.clone()]).unwrap();

        assert_eq!(outcomes[0].recipient.as_deref(), Some("300777"));
        assert_eq!(outcomes[0].content.as_deref(), Some("hello"));
        assert_eq!(outcomes[0].status, MessageStatus::Sent);
    }
}

//! JSON document codec.
//!
//! Array-shaped documents hold one object per record with the id field
//! first. Map-shaped documents hold an object keyed by id whose values omit
//! the id. Decoding accepts either layout so that documents written by
//! older tools still load.

use crate::collection::Collection;
use crate::error::{CoreError, CoreResult};
use crate::record::Fields;
use crate::schema::{DocumentShape, Schema};
use serde_json::{Map, Value};

/// One decoded document entry, before backfill.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    /// The stored id, if the entry carried one.
    pub id: Option<String>,
    /// The id was stored under a legacy key name.
    pub legacy_id: bool,
    /// Every other key, in document order.
    pub fields: Fields,
}

/// Encodes a collection as a pretty-printed document.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn encode(schema: &Schema, collection: &Collection) -> CoreResult<Vec<u8>> {
    let document = match schema.shape {
        DocumentShape::Array => Value::Array(
            collection
                .iter()
                .map(|record| {
                    let mut entry = Map::with_capacity(record.fields().len() + 1);
                    entry.insert(schema.id_field.to_string(), Value::String(record.id().to_string()));
                    entry.extend(record.fields().clone());
                    Value::Object(entry)
                })
                .collect(),
        ),
        DocumentShape::Map => Value::Object(
            collection
                .iter()
                .map(|record| (record.id().to_string(), Value::Object(record.fields().clone())))
                .collect(),
        ),
    };
    let mut bytes = serde_json::to_vec_pretty(&document)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decodes a document into raw entries.
///
/// Entries that are not objects are skipped with a warning; the remaining
/// records still load.
///
/// # Errors
///
/// Returns `Json` for malformed JSON and `InvalidOperation` when the
/// document itself is neither an array nor an object.
pub fn decode(schema: &Schema, bytes: &[u8]) -> CoreResult<Vec<RawEntry>> {
    let entries = match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(mut fields) => {
                    let (id, legacy_id) = take_id(schema, &mut fields);
                    Some(RawEntry {
                        id,
                        legacy_id,
                        fields,
                    })
                }
                other => skip(schema, &format!("entry {i}"), &other),
            })
            .collect(),
        Value::Object(entries) => entries
            .into_iter()
            .filter_map(|(key, item)| match item {
                Value::Object(mut fields) => {
                    let (embedded, legacy_id) = take_id(schema, &mut fields);
                    let id = if key.trim().is_empty() { embedded } else { Some(key) };
                    Some(RawEntry {
                        id,
                        legacy_id,
                        fields,
                    })
                }
                other => skip(schema, &format!("entry {key:?}"), &other),
            })
            .collect(),
        other => return Err(corrupt(schema, &format!("document is {}", type_of(&other)))),
    };
    Ok(entries)
}

fn skip(schema: &Schema, entry: &str, value: &Value) -> Option<RawEntry> {
    tracing::warn!(
        kind = %schema.kind,
        entry,
        found = type_of(value),
        "skipping entry that is not an object"
    );
    None
}

fn take_id(schema: &Schema, fields: &mut Fields) -> (Option<String>, bool) {
    let mut found = fields.remove(schema.id_field).as_ref().and_then(id_text);
    let mut legacy = false;
    for alias in schema.id_aliases {
        if let Some(value) = fields.remove(*alias) {
            legacy = true;
            if found.is_none() {
                found = id_text(&value);
            }
        }
    }
    (found, legacy)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn corrupt(schema: &Schema, detail: &str) -> CoreError {
    CoreError::invalid_operation(format!(
        "corrupt {} document: {detail}",
        schema.kind.file_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationPolicy;
    use crate::record::{fields, Record};
    use crate::schema::SchemaRegistry;
    use crate::types::Kind;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::standard(&ValidationPolicy::default()).unwrap()
    }

    #[test]
    fn array_document_puts_id_first() {
        let registry = registry();
        let schema = registry.schema(Kind::Maintenance).unwrap();
        let mut c = Collection::new(Kind::Maintenance);
        c.insert(Record::new(
            Kind::Maintenance,
            "MNT001",
            fields([("vehicle_id", json!("VID-ABC123")), ("maintenance_type", json!("regular"))]),
        ))
        .unwrap();

        let text = String::from_utf8(encode(schema, &c).unwrap()).unwrap();
        let id_at = text.find("maintenance_id").unwrap();
        let vehicle_at = text.find("vehicle_id").unwrap();
        assert!(id_at < vehicle_at);

        let entries = decode(schema, text.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_deref(), Some("MNT001"));
        assert!(!entries[0].fields.contains_key("maintenance_id"));
    }

    #[test]
    fn map_document_is_keyed_by_id() {
        let registry = registry();
        let schema = registry.schema(Kind::User).unwrap();
        let mut c = Collection::new(Kind::User);
        c.insert(Record::new(Kind::User, "U0001", fields([("name", json!("Ravi"))])))
            .unwrap();

        let value: Value = serde_json::from_slice(&encode(schema, &c).unwrap()).unwrap();
        assert_eq!(value, json!({"U0001": {"name": "Ravi"}}));
    }

    #[test]
    fn decode_reads_legacy_id_alias_and_numbers() {
        let registry = registry();
        let schema = registry.schema(Kind::Insurance).unwrap();
        let doc = br#"[{"Insurance ID": 12345678901, "Vehicle ID": "VID-ABC123"}, {"vehicle_id": "x"}]"#;

        let entries = decode(schema, doc).unwrap();
        assert_eq!(entries[0].id.as_deref(), Some("12345678901"));
        assert!(entries[0].legacy_id);
        assert_eq!(entries[0].fields["Vehicle ID"], "VID-ABC123");
        assert_eq!(entries[1].id, None);
    }

    #[test]
    fn decode_skips_non_object_entries() {
        let registry = registry();
        let schema = registry.schema(Kind::Vehicle).unwrap();
        assert!(decode(schema, b"[1, 2]").unwrap().is_empty());

        let doc = br#"[{"vehicle_id": "VID-OLD001", "vehicle_number": "MH12AB1234"}, 5, null]"#;
        let entries = decode(schema, doc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_deref(), Some("VID-OLD001"));

        let users = registry.schema(Kind::User).unwrap();
        let entries = decode(users, br#"{"U0001": {"name": "Asha"}, "U0002": "junk"}"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_deref(), Some("U0001"));
    }

    #[test]
    fn decode_rejects_non_container_documents() {
        let registry = registry();
        let schema = registry.schema(Kind::Vehicle).unwrap();
        assert!(matches!(decode(schema, b"\"x\""), Err(CoreError::InvalidOperation { .. })));
        assert!(matches!(decode(schema, b"{not json"), Err(CoreError::Json(_))));
    }
}

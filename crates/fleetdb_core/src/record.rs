//! Records: typed field maps tagged with a kind and an id.

use crate::types::Kind;
use serde_json::{Map, Value};

/// Field name to JSON value, in schema order.
pub type Fields = Map<String, Value>;

/// A stored record.
///
/// Records handed out by the store are clones; mutating one never affects
/// the stored collection. Changes go through `Store::update`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: Kind,
    id: String,
    fields: Fields,
}

impl Record {
    /// Creates a record. The id is not part of `fields`.
    pub fn new(kind: Kind, id: impl Into<String>, fields: Fields) -> Self {
        Self {
            kind,
            id: id.into(),
            fields,
        }
    }

    /// Returns the record kind.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the primary key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns all non-id fields.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a field as text, `None` when absent, null or not a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Returns a field as an integer.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(Value::as_i64)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Consumes the record, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

/// Builds a field map from `(name, value)` pairs.
///
/// ```rust
/// use fleetdb_core::fields;
/// use serde_json::json;
///
/// let f = fields([("name", json!("Asha")), ("age", json!(31))]);
/// assert_eq!(f["age"], 31);
/// ```
pub fn fields<I, K>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors() {
        let record = Record::new(
            Kind::User,
            "U0001",
            fields([("name", json!("Ravi")), ("age", json!(40)), ("date_of_birth", Value::Null)]),
        );
        assert_eq!(record.kind(), Kind::User);
        assert_eq!(record.id(), "U0001");
        assert_eq!(record.get_str("name"), Some("Ravi"));
        assert_eq!(record.get_i64("age"), Some(40));
        assert_eq!(record.get_str("date_of_birth"), None);
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn clones_are_independent() {
        let original = Record::new(Kind::Vehicle, "VID-AAAAAA", fields([("model", json!("x"))]));
        let mut copy = original.clone();
        copy.fields_mut().insert("model".into(), json!("y"));
        assert_eq!(original.get_str("model"), Some("x"));
    }
}

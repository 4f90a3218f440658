//! Record representation and merge semantics.
//!
//! A [`Record`] is a document with a unique identifier, an optional revision
//! token, an optional resource-type discriminator, and arbitrary key/value
//! fields. Any mutation of an existing record must carry its current
//! revision token or the store rejects it as a write conflict.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, from_value, to_value};

use crate::error::{CouchError, CouchResult};

/// A stored document.
///
/// The identifier and revision token map to CouchDB's `_id`/`_rev` fields;
/// everything else lives in the flattened `fields` map.
///
/// # Example
///
/// ```ignore
/// use couchlayer_core::record::Record;
/// use serde_json::json;
///
/// let mut book = Record::new("book-1", Some("Book"));
/// book.set("title", json!("Dune"));
/// assert_eq!(book.get("title"), Some(&json!("Dune")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique document identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current revision token; absent until the record is first stored.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Resource-type discriminator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Remaining document fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Creates an unstored record with the given identifier and resource.
    pub fn new(id: impl Into<String>, resource: Option<&str>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            resource: resource.map(str::to_string),
            fields: Map::new(),
        }
    }

    /// Builds a record from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when `value` is not an object carrying
    /// an `_id` field.
    pub fn from_value(value: Value) -> CouchResult<Self> {
        Ok(from_value(value)?)
    }

    /// Converts this record to its JSON document form.
    pub fn to_value(&self) -> CouchResult<Value> {
        Ok(to_value(self)?)
    }

    /// Returns a field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field, returning the record for chaining.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Shallow-merges `patch` over this record.
    ///
    /// Top-level keys of `patch` overwrite the corresponding keys of the
    /// record's document form, including `_rev` if the patch carries one.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when `patch` is not a JSON object.
    pub fn merged(&self, patch: &Value) -> CouchResult<Record> {
        let Some(patch_map) = patch.as_object() else {
            return Err(CouchError::Serialization(
                "partial document must be a JSON object".into(),
            ));
        };

        let mut base = self.to_value()?;
        let base_map = base
            .as_object_mut()
            .expect("record document form is always an object");

        for (key, value) in patch_map {
            base_map.insert(key.clone(), value.clone());
        }

        Record::from_value(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_form_maps_couch_fields() {
        let mut record = Record::new("author-1", Some("Author"));
        record.rev = Some("1-abc".into());
        record.set("name", json!("Frank Herbert"));

        let value = record.to_value().unwrap();
        assert_eq!(value["_id"], json!("author-1"));
        assert_eq!(value["_rev"], json!("1-abc"));
        assert_eq!(value["resource"], json!("Author"));
        assert_eq!(value["name"], json!("Frank Herbert"));

        let back = Record::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn unstored_record_serializes_without_rev() {
        let record = Record::new("author-1", None);
        let value = record.to_value().unwrap();
        assert!(value.as_object().unwrap().get("_rev").is_none());
        assert!(value.as_object().unwrap().get("resource").is_none());
    }

    #[test]
    fn merge_is_shallow() {
        let mut base = Record::new("book-1", Some("Book"));
        base.rev = Some("2-aaa".into());
        base.set("title", json!("Dune"));
        base.set("meta", json!({ "pages": 412, "isbn": "x" }));

        let merged = base
            .merged(&json!({ "title": "Dune Messiah", "meta": { "pages": 256 } }))
            .unwrap();

        assert_eq!(merged.get("title"), Some(&json!("Dune Messiah")));
        // top-level replacement, not a deep merge
        assert_eq!(merged.get("meta"), Some(&json!({ "pages": 256 })));
        assert_eq!(merged.rev.as_deref(), Some("2-aaa"));
        assert_eq!(merged.id, "book-1");
    }

    #[test]
    fn merge_rejects_non_object_patch() {
        let base = Record::new("book-1", None);
        assert!(matches!(
            base.merged(&json!(42)),
            Err(CouchError::Serialization(_))
        ));
    }

    #[test]
    fn from_value_requires_id() {
        assert!(Record::from_value(json!({ "title": "Dune" })).is_err());
    }
}

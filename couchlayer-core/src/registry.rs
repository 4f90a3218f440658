//! Explicit registry of resource types.
//!
//! Resource types are registered on a [`ResourceRegistry`] owned by the
//! caller and passed to the relationship binder and accessors explicitly;
//! there is no process-wide ambient registry.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::design::{DesignDocument, ViewDef};
use crate::naming::capitalize;
use crate::record::Record;
use crate::relations::RelationshipDescriptor;

/// Kind of a declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// A scalar string field.
    String,
    /// An ordered sequence of strings.
    Array,
}

/// A declared field with its default value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    /// Field name.
    pub name: String,
    /// Field kind.
    pub kind: PropertyKind,
    /// Default value applied to new records.
    pub default: Value,
}

/// A named view together with its query-time options.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// The view definition.
    pub def: ViewDef,
    /// Whether queries against this view request document inclusion.
    pub include_docs: bool,
}

/// A registered resource type: its relationship state, declared properties,
/// and view definitions.
#[derive(Debug, Clone, Default)]
pub struct ResourceType {
    name: String,
    children: Vec<String>,
    parents: Vec<String>,
    properties: Vec<PropertySpec>,
    views: BTreeMap<String, FilterSpec>,
    relationships: Vec<RelationshipDescriptor>,
}

impl ResourceType {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Capitalized resource name, also used as the discriminator value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capitalized names of the child resource types bound so far.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Capitalized names of the parent resource types bound so far.
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Declared properties.
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    /// Declared views.
    pub fn views(&self) -> &BTreeMap<String, FilterSpec> {
        &self.views
    }

    /// The relationship-descriptor table.
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    pub(crate) fn push_child(&mut self, related: String) {
        self.children.push(related);
    }

    pub(crate) fn push_parent(&mut self, related: String) {
        self.parents.push(related);
    }

    pub(crate) fn push_descriptor(&mut self, descriptor: RelationshipDescriptor) {
        self.relationships.push(descriptor);
    }

    /// Declares a property with a default value.
    pub fn property(&mut self, name: impl Into<String>, kind: PropertyKind, default: Value) {
        self.properties.push(PropertySpec {
            name: name.into(),
            kind,
            default,
        });
    }

    /// Declares a named view.
    pub fn filter(&mut self, name: impl Into<String>, include_docs: bool, def: ViewDef) {
        self.views
            .insert(name.into(), FilterSpec { def, include_docs });
    }

    /// Builds a new record of this type with every declared property set to
    /// its default value.
    pub fn new_record(&self, id: impl Into<String>) -> Record {
        let mut record = Record::new(id, Some(&self.name));
        for property in &self.properties {
            record.set(property.name.clone(), property.default.clone());
        }
        record
    }

    /// Builds this type's design document from its declared views.
    pub fn design_document(&self) -> DesignDocument {
        let mut design = DesignDocument::new(&self.name);
        for (name, spec) in &self.views {
            design.views.insert(name.clone(), spec.def.clone());
        }
        design
    }
}

/// A registry of resource types keyed by capitalized name.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    types: HashMap<String, ResourceType>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource type under the capitalized form of `name` and
    /// returns it for further declaration. Re-defining a name returns the
    /// existing type untouched.
    pub fn define(&mut self, name: &str) -> &mut ResourceType {
        let key = capitalize(name);
        self.types
            .entry(key.clone())
            .or_insert_with(|| ResourceType::new(&key))
    }

    /// Looks up a resource type by name, in either capitalization.
    pub fn get(&self, name: &str) -> Option<&ResourceType> {
        self.types.get(&capitalize(name))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ResourceType> {
        self.types.get_mut(&capitalize(name))
    }

    /// Whether a resource type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(&capitalize(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn define_is_idempotent_and_capitalizes() {
        let mut registry = ResourceRegistry::new();
        registry.define("book").property("title", PropertyKind::String, Value::Null);
        registry.define("Book");

        let book = registry.get("book").unwrap();
        assert_eq!(book.name(), "Book");
        assert_eq!(book.properties().len(), 1);
    }

    #[test]
    fn new_record_applies_defaults_and_discriminator() {
        let mut registry = ResourceRegistry::new();
        let book = registry.define("Book");
        book.property("author_ids", PropertyKind::Array, json!([]));
        book.property("author_id", PropertyKind::String, Value::Null);

        let record = registry.get("Book").unwrap().new_record("book-1");
        assert_eq!(record.resource.as_deref(), Some("Book"));
        assert_eq!(record.get("author_ids"), Some(&json!([])));
        assert_eq!(record.get("author_id"), Some(&Value::Null));
        assert!(record.rev.is_none());
    }

    #[test]
    fn design_document_collects_views() {
        let mut registry = ResourceRegistry::new();
        registry.define("Book").filter(
            "byAuthor",
            true,
            ViewDef::ChildrenOf {
                resource: "Book".into(),
                foreign_key: "author_ids".into(),
            },
        );

        let design = registry.get("Book").unwrap().design_document();
        assert_eq!(design.id, "_design/Book");
        assert!(design.views.contains_key("byAuthor"));
    }
}

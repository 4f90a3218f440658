//! Declarative parent/child relationships between resource types.
//!
//! Binding a relationship is a registration step executed once at
//! resource-type-definition time: it records a [`RelationshipDescriptor`] in
//! the owner's descriptor table, declares the foreign-key properties, and
//! (for parent-kind bindings) declares the children-by-parent view. Accessor
//! behavior is implemented by the generic [`ResourceRegistry::children`] and
//! [`ResourceRegistry::parent`] functions reading that table, not by
//! per-relation generated code.
//!
//! A child-kind binding presupposes a matching parent-kind binding on the
//! related type: `children` resolves through the related type's
//! `by<Owner>` view and fails at call time, not bind time, when the
//! reciprocal binding is missing.

use serde_json::{Value, json};

use crate::client::{CouchClient, ViewOptions};
use crate::connection::Connection;
use crate::design::ViewDef;
use crate::error::{CouchError, CouchResult};
use crate::naming::{capitalize, decapitalize, pluralize};
use crate::record::Record;
use crate::registry::{PropertyKind, ResourceRegistry, ResourceType};

/// Direction of a relationship declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The owner has many of the related type.
    Child,
    /// The owner belongs to one of the related type.
    Parent,
}

/// The related side of a binding: a resource name or the type itself.
#[derive(Debug, Clone, Copy)]
pub enum Related<'a> {
    /// Lowercase singular resource name, e.g. `"book"`.
    Name(&'a str),
    /// A resource type previously obtained from a registry.
    Type(&'a ResourceType),
}

impl<'a> From<&'a str> for Related<'a> {
    fn from(name: &'a str) -> Self {
        Related::Name(name)
    }
}

impl<'a> From<&'a ResourceType> for Related<'a> {
    fn from(resource: &'a ResourceType) -> Self {
        Related::Type(resource)
    }
}

/// Options accepted by [`ResourceRegistry::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    /// Whether the synthesized view requests document inclusion.
    pub include_docs: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self { include_docs: true }
    }
}

/// One row of a resource type's relationship table.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDescriptor {
    /// Direction of the binding.
    pub kind: RelationKind,
    /// Capitalized name of the related resource type.
    pub related: String,
    /// Accessor name: pluralized related name for child-kind
    /// (`books`), singular for parent-kind (`author`).
    pub accessor: String,
    /// Foreign-key field the accessor reads: `<related>_ids` for
    /// child-kind, `<related>_id` for parent-kind.
    pub foreign_key: String,
    /// Name of the synthesized view, parent-kind only.
    pub view: Option<String>,
}

impl ResourceRegistry {
    /// Declares a relationship from `owner` to `related`.
    ///
    /// Registering the same related type twice under the same direction is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::UnknownResource`] when `owner` or `related`
    /// does not resolve to a registered resource type.
    pub fn bind<'a>(
        &mut self,
        owner: &str,
        kind: RelationKind,
        related: impl Into<Related<'a>>,
        options: BindOptions,
    ) -> CouchResult<()> {
        let related_name = match related.into() {
            Related::Name(name) => capitalize(name),
            Related::Type(resource) => resource.name().to_string(),
        };
        if !self.contains(&related_name) {
            return Err(CouchError::UnknownResource(related_name));
        }

        let owner_type = self
            .get_mut(owner)
            .ok_or_else(|| CouchError::UnknownResource(owner.to_string()))?;

        let already_bound = match kind {
            RelationKind::Child => owner_type.children().contains(&related_name),
            RelationKind::Parent => owner_type.parents().contains(&related_name),
        };
        if already_bound {
            return Ok(());
        }

        let singular = decapitalize(&related_name);
        match kind {
            RelationKind::Child => {
                owner_type.push_child(related_name.clone());
                owner_type.property(format!("{singular}_ids"), PropertyKind::Array, json!([]));
                owner_type.push_descriptor(RelationshipDescriptor {
                    kind,
                    related: related_name,
                    accessor: pluralize(&singular),
                    foreign_key: format!("{singular}_ids"),
                    view: None,
                });
            }
            RelationKind::Parent => {
                let view_name = format!("by{related_name}");
                let def = ViewDef::ChildrenOf {
                    resource: owner_type.name().to_string(),
                    foreign_key: format!("{singular}_ids"),
                };
                owner_type.push_parent(related_name.clone());
                owner_type.filter(view_name.clone(), options.include_docs, def);
                owner_type.property(format!("{singular}_id"), PropertyKind::String, Value::Null);
                owner_type.push_descriptor(RelationshipDescriptor {
                    kind,
                    related: related_name,
                    accessor: singular.clone(),
                    foreign_key: format!("{singular}_id"),
                    view: Some(view_name),
                });
            }
        }

        Ok(())
    }

    /// Fetches the children of `parent_id` through the related type's
    /// reciprocal `by<Owner>` view.
    ///
    /// # Errors
    ///
    /// [`CouchError::MissingRelationship`] when `owner` never declared a
    /// child binding for `related`; [`CouchError::UnknownView`] when the
    /// related type lacks the reciprocal parent binding.
    pub async fn children<C: CouchClient>(
        &self,
        conn: &Connection<C>,
        owner: &str,
        parent_id: &str,
        related: &str,
    ) -> CouchResult<Vec<Record>> {
        let owner_type = self
            .get(owner)
            .ok_or_else(|| CouchError::UnknownResource(owner.to_string()))?;
        let descriptor = find_descriptor(owner_type, RelationKind::Child, related)?;
        let related_type = self
            .get(&descriptor.related)
            .ok_or_else(|| CouchError::UnknownResource(descriptor.related.clone()))?;

        let view_name = format!("by{}", owner_type.name());
        let spec = related_type
            .views()
            .get(&view_name)
            .ok_or_else(|| CouchError::UnknownView {
                resource: related_type.name().to_string(),
                view: view_name.clone(),
            })?;

        let path = format!("{}/{}", related_type.name(), view_name);
        let options = ViewOptions::new()
            .key(parent_id)
            .include_docs(spec.include_docs);
        conn.view(&path, &options).await
    }

    /// Instance form of [`children`](Self::children), keyed by the record's
    /// own identifier.
    pub async fn children_of<C: CouchClient>(
        &self,
        conn: &Connection<C>,
        owner: &str,
        record: &Record,
        related: &str,
    ) -> CouchResult<Vec<Record>> {
        self.children(conn, owner, &record.id, related).await
    }

    /// Fetches the parent referenced by a record's scalar foreign key.
    ///
    /// Returns `None` when the foreign key is unset; fetch failures
    /// propagate.
    pub async fn parent<C: CouchClient>(
        &self,
        conn: &Connection<C>,
        owner: &str,
        record: &Record,
        related: &str,
    ) -> CouchResult<Option<Record>> {
        let owner_type = self
            .get(owner)
            .ok_or_else(|| CouchError::UnknownResource(owner.to_string()))?;
        let descriptor = find_descriptor(owner_type, RelationKind::Parent, related)?;

        match record.get(&descriptor.foreign_key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(parent_id)) => Ok(Some(conn.get(parent_id).await?)),
            Some(other) => Err(CouchError::Serialization(format!(
                "foreign key {} must be a string, got {other}",
                descriptor.foreign_key
            ))),
        }
    }
}

fn find_descriptor<'a>(
    owner: &'a ResourceType,
    kind: RelationKind,
    related: &str,
) -> CouchResult<&'a RelationshipDescriptor> {
    let related_name = capitalize(related);
    owner
        .relationships()
        .iter()
        .find(|descriptor| descriptor.kind == kind && descriptor.related == related_name)
        .ok_or_else(|| CouchError::MissingRelationship {
            owner: owner.name().to_string(),
            related: related_name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn library() -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        registry.define("Author");
        registry.define("Book");
        registry
    }

    #[test]
    fn child_binding_declares_array_property_and_accessor() {
        let mut registry = library();
        registry
            .bind("Author", RelationKind::Child, "book", BindOptions::default())
            .unwrap();

        let author = registry.get("Author").unwrap();
        assert_eq!(author.children(), ["Book"]);

        let property = &author.properties()[0];
        assert_eq!(property.name, "book_ids");
        assert_eq!(property.kind, PropertyKind::Array);
        assert_eq!(property.default, json!([]));

        let descriptor = &author.relationships()[0];
        assert_eq!(descriptor.accessor, "books");
        assert_eq!(descriptor.foreign_key, "book_ids");
        assert_eq!(descriptor.view, None);
    }

    #[test]
    fn parent_binding_declares_view_and_scalar_property() {
        let mut registry = library();
        registry
            .bind("Book", RelationKind::Parent, "author", BindOptions::default())
            .unwrap();

        let book = registry.get("Book").unwrap();
        assert_eq!(book.parents(), ["Author"]);

        let spec = book.views().get("byAuthor").unwrap();
        assert!(spec.include_docs);
        assert_eq!(
            spec.def,
            ViewDef::ChildrenOf {
                resource: "Book".into(),
                foreign_key: "author_ids".into(),
            }
        );

        let property = &book.properties()[0];
        assert_eq!(property.name, "author_id");
        assert_eq!(property.default, Value::Null);

        let descriptor = &book.relationships()[0];
        assert_eq!(descriptor.accessor, "author");
        assert_eq!(descriptor.foreign_key, "author_id");
        assert_eq!(descriptor.view.as_deref(), Some("byAuthor"));
    }

    #[test]
    fn rebinding_is_a_no_op() {
        let mut registry = library();
        registry
            .bind("Author", RelationKind::Child, "book", BindOptions::default())
            .unwrap();
        registry
            .bind("Author", RelationKind::Child, "book", BindOptions::default())
            .unwrap();

        let author = registry.get("Author").unwrap();
        assert_eq!(author.children().len(), 1);
        assert_eq!(author.properties().len(), 1);
        assert_eq!(author.relationships().len(), 1);

        let mut registry = library();
        registry
            .bind("Book", RelationKind::Parent, "author", BindOptions::default())
            .unwrap();
        registry
            .bind("Book", RelationKind::Parent, "author", BindOptions::default())
            .unwrap();

        let book = registry.get("Book").unwrap();
        assert_eq!(book.parents().len(), 1);
        assert_eq!(book.views().len(), 1);
        assert_eq!(book.relationships().len(), 1);
    }

    #[test]
    fn binding_by_type_reference_resolves() {
        let mut registry = library();
        let book = registry.get("Book").unwrap().clone();
        registry
            .bind("Author", RelationKind::Child, &book, BindOptions::default())
            .unwrap();
        assert_eq!(registry.get("Author").unwrap().children(), ["Book"]);
    }

    #[test]
    fn unknown_related_resource_fails_at_bind_time() {
        let mut registry = library();
        let err = registry
            .bind("Author", RelationKind::Child, "pamphlet", BindOptions::default())
            .unwrap_err();
        assert!(matches!(err, CouchError::UnknownResource(name) if name == "Pamphlet"));
    }

    #[test]
    fn opposite_directions_are_tracked_independently() {
        let mut registry = library();
        registry
            .bind("Author", RelationKind::Child, "book", BindOptions::default())
            .unwrap();
        registry
            .bind("Author", RelationKind::Parent, "book", BindOptions::default())
            .unwrap();

        let author = registry.get("Author").unwrap();
        assert_eq!(author.children(), ["Book"]);
        assert_eq!(author.parents(), ["Book"]);
        assert_eq!(author.relationships().len(), 2);
    }
}

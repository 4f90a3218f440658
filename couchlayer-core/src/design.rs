//! Design documents and data-described view definitions.
//!
//! A design document is a singleton per resource type (identified as
//! `_design/<ResourceName>`) holding named view definitions. Views that
//! index children by parent key are described as data (the resource-type
//! name and the foreign-key field name) and compiled to a store-executable
//! map function only when the design document is serialized. The serialized
//! form keeps the two parameters alongside the compiled function so stores
//! without a JavaScript engine can evaluate the view structurally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of the design document for a resource type.
pub fn design_id(resource: &str) -> String {
    format!("_design/{resource}")
}

/// Parameters of a children-by-parent view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewParams {
    /// Resource-type discriminator the view selects on.
    pub resource: String,
    /// Name of the foreign-key-array field whose entries are emitted.
    pub foreign_key: String,
}

/// A named view definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ViewDefRepr", into = "ViewDefRepr")]
pub enum ViewDef {
    /// A hand-written map function.
    Map {
        /// The map-function source.
        map: String,
    },
    /// A children-by-parent index: for every document whose `resource`
    /// field equals `resource`, one row per entry of the document's
    /// `foreign_key` array, keyed by the entry's value.
    ChildrenOf {
        /// Resource-type discriminator the view selects on.
        resource: String,
        /// Name of the foreign-key-array field.
        foreign_key: String,
    },
}

impl ViewDef {
    /// Renders the map function the store executes server-side.
    ///
    /// The function is pure over a single document parameter and closed
    /// only over the two view parameters, since it runs inside the store's
    /// query engine rather than in this process.
    pub fn compile_map(&self) -> String {
        match self {
            ViewDef::Map { map } => map.clone(),
            ViewDef::ChildrenOf {
                resource,
                foreign_key,
            } => format!(
                "function (doc) {{ if (doc.resource === '{resource}') {{ \
                 for (var i = 0; i < doc.{foreign_key}.length; i++) {{ \
                 emit(doc.{foreign_key}[i], null); }} }} }}"
            ),
        }
    }

    /// Returns the view parameters when this view is data-described.
    pub fn params(&self) -> Option<ViewParams> {
        match self {
            ViewDef::Map { .. } => None,
            ViewDef::ChildrenOf {
                resource,
                foreign_key,
            } => Some(ViewParams {
                resource: resource.clone(),
                foreign_key: foreign_key.clone(),
            }),
        }
    }
}

/// Serialized form of a view definition: the compiled map function plus,
/// for data-described views, the parameters it was compiled from.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ViewDefRepr {
    map: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ViewParams>,
}

impl From<ViewDef> for ViewDefRepr {
    fn from(def: ViewDef) -> Self {
        Self {
            map: def.compile_map(),
            options: def.params(),
        }
    }
}

impl From<ViewDefRepr> for ViewDef {
    fn from(repr: ViewDefRepr) -> Self {
        match repr.options {
            Some(params) => ViewDef::ChildrenOf {
                resource: params.resource,
                foreign_key: params.foreign_key,
            },
            None => ViewDef::Map { map: repr.map },
        }
    }
}

/// A per-resource-type view-definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Document identifier, `_design/<ResourceName>`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision token; absent until first persisted.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// View language marker.
    pub language: String,
    /// Named view definitions.
    #[serde(default)]
    pub views: BTreeMap<String, ViewDef>,
}

impl DesignDocument {
    /// Creates an empty design document for a resource type.
    pub fn new(resource: &str) -> Self {
        Self {
            id: design_id(resource),
            rev: None,
            language: "javascript".to_string(),
            views: BTreeMap::new(),
        }
    }
}

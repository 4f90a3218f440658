//! In-memory storage implementation of the store client contract.
//!
//! Documents are stored as JSON values in a HashMap behind an async-safe
//! read-write lock, with revision tokens generated as `<generation>-<uuid>`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::{Value, json};
use uuid::Uuid;

use couchlayer_core::{
    client::{CouchClient, DocumentMeta, ViewOptions, ViewResult, ViewRow, WriteReceipt},
    design::{DesignDocument, ViewDef},
    error::{CouchError, CouchResult},
};

/// In-memory document store with CouchDB revision semantics.
///
/// The store is cloneable; clones share the same underlying data. A fresh
/// store has no database yet; the first design-document sync (or an
/// explicit `create_database` call) creates it, mirroring a CouchDB host
/// without the target database.
///
/// # Example
///
/// ```ignore
/// use couchlayer_memory::InMemoryCouch;
/// use couchlayer_core::client::CouchClient;
/// use serde_json::json;
///
/// let store = InMemoryCouch::with_database("library");
/// let receipt = store.put("book-1", &json!({ "title": "Dune" })).await?;
/// assert!(receipt.rev.starts_with("1-"));
/// # Ok::<(), couchlayer_core::error::CouchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCouch {
    database: String,
    created: Arc<RwLock<bool>>,
    docs: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryCouch {
    /// Creates a store whose database does not exist yet.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            created: Arc::new(RwLock::new(false)),
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a store with the database already created.
    pub fn with_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            created: Arc::new(RwLock::new(true)),
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether the database has been created.
    pub async fn database_exists(&self) -> bool {
        *self.created.read().await
    }

    /// Number of stored documents, design documents included.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    fn next_rev(old: Option<&str>) -> String {
        let generation = old
            .and_then(|rev| rev.split_once('-'))
            .and_then(|(n, _)| n.parse::<u64>().ok())
            .unwrap_or(0);
        format!("{}-{}", generation + 1, Uuid::new_v4().simple())
    }

    fn current_rev(doc: &Value) -> Option<&str> {
        doc.get("_rev").and_then(Value::as_str)
    }

    async fn require_database(&self) -> CouchResult<()> {
        if *self.created.read().await {
            Ok(())
        } else {
            Err(CouchError::NotFound(self.database.clone()))
        }
    }

    fn evaluate_children_of(
        docs: &HashMap<String, Value>,
        resource: &str,
        foreign_key: &str,
        options: &ViewOptions,
    ) -> Vec<ViewRow> {
        let mut rows = Vec::new();
        for (id, doc) in docs {
            if id.starts_with("_design/") {
                continue;
            }
            if doc.get("resource").and_then(Value::as_str) != Some(resource) {
                continue;
            }
            let Some(keys) = doc.get(foreign_key).and_then(Value::as_array) else {
                continue;
            };
            for key in keys {
                if let Some(wanted) = &options.key {
                    if key != wanted {
                        continue;
                    }
                }
                if let Some(wanted) = &options.keys {
                    if !wanted.contains(key) {
                        continue;
                    }
                }
                rows.push(ViewRow {
                    id: Some(id.clone()),
                    key: key.clone(),
                    value: Some(Value::Null),
                    doc: options.include_docs.then(|| doc.clone()),
                });
            }
        }
        sort_rows(&mut rows);
        rows
    }
}

fn sort_rows(rows: &mut [ViewRow]) {
    rows.sort_by(|a, b| {
        let left = (a.key.to_string(), a.id.clone());
        let right = (b.key.to_string(), b.id.clone());
        left.cmp(&right)
    });
}

fn apply_window(mut rows: Vec<ViewRow>, options: &ViewOptions) -> Vec<ViewRow> {
    if options.descending {
        rows.reverse();
    }
    let skip = options.skip.unwrap_or(0);
    let limit = options.limit.unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(limit).collect()
}

#[async_trait]
impl CouchClient for InMemoryCouch {
    async fn head(&self, id: &str) -> CouchResult<DocumentMeta> {
        if !*self.created.read().await {
            return Ok(DocumentMeta {
                rev: None,
                status: 404,
            });
        }
        let docs = self.docs.read().await;
        match docs.get(id) {
            Some(doc) => Ok(DocumentMeta {
                rev: Self::current_rev(doc).map(str::to_string),
                status: 200,
            }),
            None => Ok(DocumentMeta {
                rev: None,
                status: 404,
            }),
        }
    }

    async fn get(&self, id: &str) -> CouchResult<Value> {
        self.require_database().await?;
        self.docs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CouchError::NotFound(id.to_string()))
    }

    async fn get_many(&self, ids: &[String]) -> CouchResult<ViewResult> {
        self.require_database().await?;
        let docs = self.docs.read().await;
        let rows = ids
            .iter()
            .map(|id| {
                let doc = docs.get(id);
                ViewRow {
                    id: Some(id.clone()),
                    key: json!(id),
                    value: doc.map(|d| json!({ "rev": Self::current_rev(d) })),
                    doc: doc.cloned(),
                }
            })
            .collect();
        Ok(ViewResult {
            total_rows: None,
            offset: None,
            rows,
        })
    }

    async fn put(&self, id: &str, doc: &Value) -> CouchResult<WriteReceipt> {
        if !*self.created.read().await {
            return Err(CouchError::DatabaseMissing(self.database.clone()));
        }
        if !doc.is_object() {
            return Err(CouchError::Serialization(
                "document must be a JSON object".into(),
            ));
        }

        let mut docs = self.docs.write().await;
        let incoming_rev = Self::current_rev(doc);
        if let Some(current) = docs.get(id) {
            if Self::current_rev(current) != incoming_rev {
                return Err(CouchError::Conflict(id.to_string()));
            }
        }

        let rev = Self::next_rev(incoming_rev);
        let mut stored = doc.clone();
        if let Some(fields) = stored.as_object_mut() {
            fields.insert("_id".to_string(), json!(id));
            fields.insert("_rev".to_string(), json!(rev.clone()));
        }
        docs.insert(id.to_string(), stored);

        Ok(WriteReceipt {
            id: id.to_string(),
            rev,
            status: 201,
        })
    }

    async fn merge(&self, id: &str, patch: &Value) -> CouchResult<Value> {
        self.require_database().await?;
        let Some(patch_map) = patch.as_object() else {
            return Err(CouchError::Serialization(
                "partial document must be a JSON object".into(),
            ));
        };

        let mut docs = self.docs.write().await;
        let current = docs
            .get(id)
            .cloned()
            .ok_or_else(|| CouchError::NotFound(id.to_string()))?;

        let mut merged = current.clone();
        if let Some(fields) = merged.as_object_mut() {
            for (key, value) in patch_map {
                fields.insert(key.clone(), value.clone());
            }
            let rev = Self::next_rev(Self::current_rev(&current));
            fields.insert("_id".to_string(), json!(id));
            fields.insert("_rev".to_string(), json!(rev));
        }
        docs.insert(id.to_string(), merged.clone());
        Ok(merged)
    }

    async fn remove(&self, id: &str, rev: &str) -> CouchResult<WriteReceipt> {
        self.require_database().await?;
        let mut docs = self.docs.write().await;
        let current = docs
            .get(id)
            .ok_or_else(|| CouchError::NotFound(id.to_string()))?;
        if Self::current_rev(current) != Some(rev) {
            return Err(CouchError::Conflict(id.to_string()));
        }
        docs.remove(id);
        Ok(WriteReceipt {
            id: id.to_string(),
            rev: rev.to_string(),
            status: 200,
        })
    }

    async fn view(&self, path: &str, options: &ViewOptions) -> CouchResult<ViewResult> {
        self.require_database().await?;
        let (design_name, view_name) = path
            .split_once('/')
            .ok_or_else(|| CouchError::NotFound(path.to_string()))?;

        let docs = self.docs.read().await;
        let design_doc = docs
            .get(&format!("_design/{design_name}"))
            .cloned()
            .ok_or_else(|| CouchError::NotFound(format!("_design/{design_name}")))?;
        let design: DesignDocument = serde_json::from_value(design_doc)?;
        let def = design
            .views
            .get(view_name)
            .ok_or_else(|| CouchError::NotFound(path.to_string()))?;

        let rows = match def {
            ViewDef::ChildrenOf {
                resource,
                foreign_key,
            } => Self::evaluate_children_of(&docs, resource, foreign_key, options),
            ViewDef::Map { .. } => {
                return Err(CouchError::Unsupported(
                    "javascript map views in the memory store",
                ));
            }
        };
        let rows = apply_window(rows, options);

        Ok(ViewResult {
            total_rows: Some(rows.len() as u64),
            offset: None,
            rows,
        })
    }

    async fn all_docs(&self, options: &ViewOptions) -> CouchResult<ViewResult> {
        self.require_database().await?;
        let docs = self.docs.read().await;
        let mut ids: Vec<&String> = docs.keys().collect();
        ids.sort();

        let rows: Vec<ViewRow> = ids
            .into_iter()
            .filter(|id| match &options.keys {
                Some(keys) => keys.contains(&json!(id)),
                None => true,
            })
            .map(|id| {
                let doc = &docs[id];
                ViewRow {
                    id: Some(id.clone()),
                    key: json!(id),
                    value: Some(json!({ "rev": Self::current_rev(doc) })),
                    doc: options.include_docs.then(|| doc.clone()),
                }
            })
            .collect();
        let rows = apply_window(rows, options);

        Ok(ViewResult {
            total_rows: Some(docs.len() as u64),
            offset: None,
            rows,
        })
    }

    async fn create_database(&self) -> CouchResult<()> {
        *self.created.write().await = true;
        Ok(())
    }

    fn database(&self) -> &str {
        &self.database
    }
}

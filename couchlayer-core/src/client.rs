//! Store client contract for CouchDB-style document databases.
//!
//! This module defines the capability set the connection requires from an
//! underlying store client. Implementations talk HTTP to a real CouchDB
//! (`couchlayer-http`) or keep everything in process memory
//! (`couchlayer-memory`); the connection layers revision-aware semantics on
//! top without knowing which.
//!
//! # Traits
//!
//! - [`CouchClient`]: the client contract
//!
//! All operations are async and report failure through
//! [`CouchResult`](crate::error::CouchResult). Transport-level errors must be
//! surfaced as [`CouchError::Transport`](crate::error::CouchError) and are
//! never retried by the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::error::CouchResult;

/// Options for a view or `_all_docs` request.
///
/// Only the fields a request sets are transmitted; `key` and `keys` values
/// are JSON-typed because CouchDB compares keys structurally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    /// Restrict rows to this exact key.
    pub key: Option<Value>,
    /// Restrict rows to this set of keys.
    pub keys: Option<Vec<Value>>,
    /// Ask the store to inline the full document into each row.
    pub include_docs: bool,
    /// Maximum number of rows.
    pub limit: Option<usize>,
    /// Number of rows to skip.
    pub skip: Option<usize>,
    /// Reverse the row order.
    pub descending: bool,
}

impl ViewOptions {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts rows to the given key.
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Restricts rows to the given keys.
    pub fn keys(mut self, keys: Vec<Value>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Requests document inclusion for every row.
    pub fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    /// Caps the number of returned rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A single row of a view or batch-read result.
///
/// Rows carry either an inline document (`doc`, when document inclusion was
/// requested) or a bare emitted `value`, and optionally an explicit row
/// identifier distinct from the document's own `_id` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRow {
    /// Identifier of the document that emitted this row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The emitted key.
    #[serde(default)]
    pub key: Value,
    /// The emitted value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// The full document, present when document inclusion was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

/// An ordered view or batch-read result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewResult {
    /// Total number of rows in the view, when the store reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    /// Offset of the first returned row, when the store reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// The rows, in store order.
    pub rows: Vec<ViewRow>,
}

/// Response metadata from a `head` probe.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    /// Current revision token, absent when the document does not exist.
    pub rev: Option<String>,
    /// HTTP-style status of the probe.
    pub status: u16,
}

/// Receipt for a successful write (put or remove).
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReceipt {
    /// Identifier of the written document.
    pub id: String,
    /// Newly assigned revision token.
    pub rev: String,
    /// HTTP-style status; successful creates report 201.
    pub status: u16,
}

/// Abstract interface to a CouchDB-style document store.
///
/// The store must enforce optimistic concurrency: a `put` or `remove` whose
/// revision token does not match the currently stored one is rejected with
/// [`CouchError::Conflict`](crate::error::CouchError), and a write into an
/// absent database is rejected with
/// [`CouchError::DatabaseMissing`](crate::error::CouchError) so the
/// synchronizer can create it.
#[async_trait]
pub trait CouchClient: Send + Sync + Debug {
    /// Probes a document's metadata without fetching its body.
    ///
    /// An absent document yields `Ok` with no revision token; only
    /// transport-level failures are errors.
    async fn head(&self, id: &str) -> CouchResult<DocumentMeta>;

    /// Fetches a single document by identifier.
    async fn get(&self, id: &str) -> CouchResult<Value>;

    /// Fetches many documents in a single batch read.
    ///
    /// Returns one row per resolved identifier, in store order, with the
    /// document inlined.
    async fn get_many(&self, ids: &[String]) -> CouchResult<ViewResult>;

    /// Creates or replaces a document.
    ///
    /// When the document already exists, `doc` must embed the current
    /// revision token or the store rejects the write as a conflict.
    async fn put(&self, id: &str, doc: &Value) -> CouchResult<WriteReceipt>;

    /// Partially updates a document server-side.
    ///
    /// The store merges `patch` shallowly over the current document and
    /// returns the merged stored document, including its new revision token.
    async fn merge(&self, id: &str, patch: &Value) -> CouchResult<Value>;

    /// Removes a document at the given revision.
    async fn remove(&self, id: &str, rev: &str) -> CouchResult<WriteReceipt>;

    /// Queries a named view, `path` being `"<DesignName>/<viewName>"`.
    async fn view(&self, path: &str, options: &ViewOptions) -> CouchResult<ViewResult>;

    /// Reads every document in the database.
    async fn all_docs(&self, options: &ViewOptions) -> CouchResult<ViewResult>;

    /// Creates the target database.
    ///
    /// Invoked only as a recovery path when a write failed because the
    /// database is absent. Creating an existing database is not an error.
    async fn create_database(&self) -> CouchResult<()>;

    /// Name of the database this client targets.
    fn database(&self) -> &str;
}

#[async_trait]
impl<C> CouchClient for &C
where
    C: CouchClient,
{
    async fn head(&self, id: &str) -> CouchResult<DocumentMeta> {
        (*self).head(id).await
    }

    async fn get(&self, id: &str) -> CouchResult<Value> {
        (*self).get(id).await
    }

    async fn get_many(&self, ids: &[String]) -> CouchResult<ViewResult> {
        (*self).get_many(ids).await
    }

    async fn put(&self, id: &str, doc: &Value) -> CouchResult<WriteReceipt> {
        (*self).put(id, doc).await
    }

    async fn merge(&self, id: &str, patch: &Value) -> CouchResult<Value> {
        (*self).merge(id, patch).await
    }

    async fn remove(&self, id: &str, rev: &str) -> CouchResult<WriteReceipt> {
        (*self).remove(id, rev).await
    }

    async fn view(&self, path: &str, options: &ViewOptions) -> CouchResult<ViewResult> {
        (*self).view(path, options).await
    }

    async fn all_docs(&self, options: &ViewOptions) -> CouchResult<ViewResult> {
        (*self).all_docs(options).await
    }

    async fn create_database(&self) -> CouchResult<()> {
        (*self).create_database().await
    }

    fn database(&self) -> &str {
        (*self).database()
    }
}

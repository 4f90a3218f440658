//! Revision-aware store connection.
//!
//! [`Connection`] wraps a [`CouchClient`] and layers the store's
//! optimistic-concurrency requirements on top: partial updates and deletes
//! of existing documents must carry the current revision token, and the
//! connection keeps a write-through cache of records it has seen to avoid a
//! redundant revision lookup before mutating.
//!
//! The cache is not a concurrency-control mechanism. It is populated on
//! successful reads and puts, never invalidated, and can hand out a stale
//! token when another process mutated the same record; the resulting
//! conflict surfaces to the caller unchanged. Callers issuing concurrent
//! mutations to the same identifier must serialize themselves.
//!
//! # Example
//!
//! ```ignore
//! use couchlayer_core::{connection::Connection, record::Record};
//! use serde_json::json;
//!
//! let conn = Connection::new(client);
//! let author = conn.put("author-1", Record::new("author-1", Some("Author"))).await?;
//! // cached: merges client-side, exactly one round trip
//! conn.update("author-1", &json!({ "name": "Frank Herbert" })).await?;
//! # Ok::<(), couchlayer_core::error::CouchError>(())
//! ```

use std::collections::HashMap;

use mea::rwlock::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{CouchClient, DocumentMeta, ViewOptions, ViewResult, WriteReceipt};
use crate::design::DesignDocument;
use crate::error::{CouchError, CouchResult};
use crate::record::Record;
use crate::registry::ResourceType;

/// A connection to one database of a CouchDB-style store.
#[derive(Debug)]
pub struct Connection<C: CouchClient> {
    client: C,
    cache: RwLock<HashMap<String, Record>>,
    design_revs: RwLock<HashMap<String, String>>,
}

impl<C: CouchClient> Connection<C> {
    /// Creates a connection over the given store client.
    pub fn new(client: C) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
            design_revs: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying store client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Bulk-loading records is not valid for the couchdb connection kind;
    /// this always fails. Present for interface parity with offline
    /// backends.
    pub fn load(&self, _records: Vec<Record>) -> CouchResult<()> {
        Err(CouchError::Unsupported("load"))
    }

    /// Probes a document's metadata.
    pub async fn head(&self, id: &str) -> CouchResult<DocumentMeta> {
        self.client.head(id).await
    }

    /// Fetches a single record and refreshes its cache entry.
    pub async fn get(&self, id: &str) -> CouchResult<Record> {
        let value = self.client.get(id).await?;
        let record = Record::from_value(value)?;
        self.cache
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    /// Fetches many records in a single batch read, in store-returned
    /// order. Rows without a resolved document are skipped.
    pub async fn get_many(&self, ids: &[String]) -> CouchResult<Vec<Record>> {
        let result = self.client.get_many(ids).await?;
        let mut records = Vec::with_capacity(result.rows.len());
        let mut cache = self.cache.write().await;
        for row in result.rows {
            let Some(doc) = row.doc else { continue };
            let record = Record::from_value(doc)?;
            cache.insert(record.id.clone(), record.clone());
            records.push(record);
        }
        Ok(records)
    }

    /// Creates or replaces a record.
    ///
    /// The record's identifier is forced to `id`; on success the returned
    /// record carries the newly assigned revision token and the cache entry
    /// is refreshed.
    ///
    /// # Errors
    ///
    /// [`CouchError::Conflict`] when the embedded revision token is stale
    /// or missing for an existing document.
    pub async fn put(&self, id: &str, mut record: Record) -> CouchResult<Record> {
        record.id = id.to_string();
        let receipt = self.client.put(id, &record.to_value()?).await?;
        record.rev = Some(receipt.rev);
        self.cache
            .write()
            .await
            .insert(id.to_string(), record.clone());
        Ok(record)
    }

    /// Alias for [`put`](Self::put).
    pub async fn save(&self, id: &str, record: Record) -> CouchResult<Record> {
        self.put(id, record).await
    }

    /// Partially updates a record.
    ///
    /// When a prior version of `id` is cached, the merge is synthesized
    /// client-side (`patch` shallow-merged over the cached full document)
    /// and written with a single put. Otherwise the store's server-side
    /// merge operation is used, trading a round trip for correctness when
    /// no cached base is available.
    pub async fn update(&self, id: &str, patch: &Value) -> CouchResult<Record> {
        let cached = self.cache.read().await.get(id).cloned();
        match cached {
            Some(base) => {
                debug!(id, "update: merging against cached document");
                self.put(id, base.merged(patch)?).await
            }
            None => {
                debug!(id, "update: delegating to server-side merge");
                Record::from_value(self.client.merge(id, patch).await?)
            }
        }
    }

    /// Removes a record.
    ///
    /// Uses the cached revision token when available; otherwise issues a
    /// single metadata probe to obtain the current token first. A probe
    /// failure propagates unchanged; a probe without a token yields
    /// [`CouchError::NotFound`].
    pub async fn destroy(&self, id: &str) -> CouchResult<WriteReceipt> {
        let cached_rev = self
            .cache
            .read()
            .await
            .get(id)
            .and_then(|record| record.rev.clone());

        let rev = match cached_rev {
            Some(rev) => {
                debug!(id, "destroy: using cached revision");
                rev
            }
            None => {
                debug!(id, "destroy: probing current revision");
                let meta = self.client.head(id).await?;
                meta.rev
                    .ok_or_else(|| CouchError::NotFound(id.to_string()))?
            }
        };

        self.client.remove(id, &rev).await
    }

    /// Queries a named view and normalizes its rows into records.
    ///
    /// Each row resolves to its inline document when present, else its
    /// emitted value; a row identifier distinct from the document's own
    /// `_id` overwrites it. Rows resolving to nothing object-shaped are
    /// skipped.
    pub async fn view(&self, path: &str, options: &ViewOptions) -> CouchResult<Vec<Record>> {
        let result = self.client.view(path, options).await?;
        rows_to_records(result)
    }

    /// Fetches every record in the database, documents included, with the
    /// same row normalization as [`view`](Self::view).
    pub async fn all(&self) -> CouchResult<Vec<Record>> {
        let options = ViewOptions::new().include_docs(true);
        let result = self.client.all_docs(&options).await?;
        rows_to_records(result)
    }

    /// Idempotently ensures the resource type's design document exists.
    ///
    /// A token cached by an earlier successful sync short-circuits without
    /// a network call; the document may still have changed externally, so
    /// this is an optimization rather than a guarantee. Otherwise: probe the
    /// design document, attach any current token, and write it. A write
    /// rejected because the database itself is absent triggers one database
    /// creation followed by one retry of the whole sequence; every other
    /// failure (including the conflict raised when a concurrent creator won
    /// the race) propagates unchanged.
    pub async fn sync(&self, resource: &ResourceType) -> CouchResult<DesignDocument> {
        let mut design = resource.design_document();
        let id = design.id.clone();

        if let Some(rev) = self.design_revs.read().await.get(&id) {
            design.rev = Some(rev.clone());
            return Ok(design);
        }

        let mut created_database = false;
        loop {
            let meta = self.client.head(&id).await?;
            design.rev = meta.rev;

            match self.client.put(&id, &serde_json::to_value(&design)?).await {
                Ok(receipt) => {
                    design.rev = Some(receipt.rev.clone());
                    self.design_revs
                        .write()
                        .await
                        .insert(id.clone(), receipt.rev);
                    info!(design = %id, "design document synchronized");
                    return Ok(design);
                }
                Err(CouchError::DatabaseMissing(database)) if !created_database => {
                    info!(database = %database, "creating missing database before resync");
                    self.client.create_database().await?;
                    created_database = true;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn rows_to_records(result: ViewResult) -> CouchResult<Vec<Record>> {
    let mut records = Vec::with_capacity(result.rows.len());
    for row in result.rows {
        // With document inclusion the store sets `doc`; bare views only
        // carry the emitted `value`.
        let Some(mut doc) = row.doc.or(row.value) else {
            continue;
        };
        match doc.as_object_mut() {
            Some(fields) => {
                if let Some(id) = row.id {
                    fields.insert("_id".to_string(), Value::String(id));
                }
            }
            None => continue,
        }
        records.push(Record::from_value(doc)?);
    }
    Ok(records)
}

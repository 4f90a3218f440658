//! Error types and result types for store and relationship operations.
//!
//! This module provides error handling for every layer of the crate.
//! Use [`CouchResult<T>`] as the return type for fallible operations.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the connection, the synchronizer,
/// and the relationship binder.
///
/// Transport, conflict, and not-found failures propagate from the store client
/// unchanged; nothing is retried at this layer except the synchronizer's
/// single database-creation path.
#[derive(Error, Debug)]
pub enum CouchError {
    /// Network or protocol failure talking to the store.
    #[error("transport error: {0}")]
    Transport(String),
    /// The store rejected a write because the supplied revision token is
    /// stale or missing. The caller must re-fetch and re-apply.
    #[error("write conflict on document {0}")]
    Conflict(String),
    /// The requested identifier is absent from the database.
    #[error("document not found: {0}")]
    NotFound(String),
    /// The target database itself does not exist yet.
    #[error("database {0} does not exist")]
    DatabaseMissing(String),
    /// The operation is declared invalid for this backend kind.
    #[error("{0} is not supported by the couchdb connection")]
    Unsupported(&'static str),
    /// A relationship argument did not resolve to a registered resource type.
    #[error("unknown resource {0}")]
    UnknownResource(String),
    /// A relationship accessor was called on a type that never declared it.
    #[error("no relationship from {owner} to {related}")]
    MissingRelationship {
        /// Resource type the accessor was called on.
        owner: String,
        /// Related resource type the accessor asked for.
        related: String,
    },
    /// The reciprocal view for a child accessor was never declared.
    #[error("no view {view} declared on resource {resource}")]
    UnknownView {
        /// Resource type expected to carry the view.
        resource: String,
        /// Missing view name.
        view: String,
    },
    /// A connection string could not be parsed.
    #[error("invalid connection uri: {0}")]
    InvalidUri(String),
    /// Serialization/deserialization error when converting documents.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for couchlayer operations.
pub type CouchResult<T> = Result<T, CouchError>;

impl From<SerdeJsonError> for CouchError {
    fn from(err: SerdeJsonError) -> Self {
        CouchError::Serialization(err.to_string())
    }
}

//! In-memory store client for couchlayer.
//!
//! This crate provides [`InMemoryCouch`], a [`CouchClient`] implementation
//! that keeps documents in process memory while enforcing the same
//! revision-token semantics as the HTTP client: writes against a stale or
//! missing token are rejected as conflicts, and writes into an uncreated
//! database fail until `create_database` is called. Data-described views
//! are evaluated structurally, so relationship accessors work without a
//! JavaScript engine.
//!
//! [`CouchClient`]: couchlayer_core::client::CouchClient

mod store;

pub use store::InMemoryCouch;

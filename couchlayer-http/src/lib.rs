//! HTTP store client for couchlayer.
//!
//! This crate implements the [`CouchClient`] contract over CouchDB's HTTP
//! API using reqwest. Status codes and error bodies are mapped onto the
//! core error taxonomy: 404 with a database-absent reason becomes
//! [`DatabaseMissing`], plain 404 becomes [`NotFound`], 409 becomes
//! [`Conflict`], and everything network-shaped becomes [`Transport`].
//!
//! [`CouchClient`]: couchlayer_core::client::CouchClient
//! [`DatabaseMissing`]: couchlayer_core::error::CouchError::DatabaseMissing
//! [`NotFound`]: couchlayer_core::error::CouchError::NotFound
//! [`Conflict`]: couchlayer_core::error::CouchError::Conflict
//! [`Transport`]: couchlayer_core::error::CouchError::Transport

mod client;

pub use client::HttpCouchClient;

//! A revision-aware CouchDB resource layer that binds resource types to a
//! document store over a pluggable client contract.
//!
//! This crate is the core of the couchlayer project and provides:
//!
//! - **Client contract** ([`client`]) - The capability set required from a CouchDB-style store client
//! - **Records** ([`record`]) - Documents with identifier, revision token, and resource discriminator
//! - **Connection** ([`connection`]) - Revision-aware get/put/update/destroy/view operations with a write-through cache
//! - **Design documents** ([`design`]) - Data-described view definitions and their map-function compilation
//! - **Resource registry** ([`registry`]) - Explicit per-process registry of resource types
//! - **Relationships** ([`relations`]) - Declarative parent/child bindings and generic accessors
//! - **Configuration** ([`config`]) - Connection settings and connection-string parsing
//! - **Error handling** ([`error`]) - Comprehensive error types and result types
//!
//! # Example
//!
//! ```ignore
//! use couchlayer_core::{connection::Connection, registry::ResourceRegistry};
//! use couchlayer_core::relations::{BindOptions, RelationKind};
//!
//! let mut registry = ResourceRegistry::new();
//! registry.define("Author");
//! registry.define("Book");
//! registry.bind("Author", RelationKind::Child, "book", BindOptions::default())?;
//! registry.bind("Book", RelationKind::Parent, "author", BindOptions::default())?;
//!
//! let conn = Connection::new(client);
//! conn.sync(registry.get("Book").unwrap()).await?;
//! # Ok::<(), couchlayer_core::error::CouchError>(())
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_core;

pub mod client;
pub mod config;
pub mod connection;
pub mod design;
pub mod error;
pub mod naming;
pub mod record;
pub mod registry;
pub mod relations;

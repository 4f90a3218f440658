//! Main couchlayer crate providing a revision-aware CouchDB resource layer.
//!
//! This crate is the primary entry point for users of the couchlayer
//! framework. It re-exports the core types and functionality from the
//! sub-crates and provides convenient access to the available store clients.
//!
//! # Features
//!
//! - **Revision-aware mutations** - partial updates and deletes fetch or
//!   reuse the current revision token, satisfying the store's optimistic
//!   concurrency model
//! - **Declarative relationships** - parent/child bindings synthesize
//!   foreign-key properties, accessors, and server-side views from a
//!   descriptor table
//! - **Pluggable clients** - HTTP against a real CouchDB (behind the `http`
//!   feature) or fully in memory
//!
//! # Quick Start
//!
//! ```ignore
//! use couchlayer::{prelude::*, memory::InMemoryCouch};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> CouchResult<()> {
//!     // Declare the resource types and their relationship
//!     let mut registry = ResourceRegistry::new();
//!     registry.define("Author");
//!     registry.define("Book");
//!     registry.bind("Author", RelationKind::Child, "book", BindOptions::default())?;
//!     registry.bind("Book", RelationKind::Parent, "author", BindOptions::default())?;
//!
//!     // Connect and make sure the Book design document exists
//!     let conn = Connection::new(InMemoryCouch::new("library"));
//!     conn.sync(registry.get("Book").unwrap()).await?;
//!
//!     // Store an author and a book pointing back at it
//!     conn.put("author-1", registry.get("Author").unwrap().new_record("author-1")).await?;
//!     let mut book = registry.get("Book").unwrap().new_record("book-1");
//!     book.set("title", json!("Dune"));
//!     book.set("author_ids", json!(["author-1"]));
//!     conn.put("book-1", book).await?;
//!
//!     // Walk the relationship both ways
//!     let books = registry.children(&conn, "Author", "author-1", "book").await?;
//!     println!("author-1 wrote {} book(s)", books.len());
//!     Ok(())
//! }
//! ```

pub use couchlayer_core::{
    client, config, connection, design, error, naming, record, registry, relations,
};

/// The in-memory store client.
pub mod memory {
    pub use couchlayer_memory::InMemoryCouch;
}

/// The HTTP store client, available with the `http` feature.
#[cfg(feature = "http")]
pub mod http {
    pub use couchlayer_http::HttpCouchClient;
}

pub mod prelude;

//! Convenient re-exports of commonly used types from couchlayer.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use couchlayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - The store client contract and its row/receipt types
//! - The revision-aware connection
//! - Records and design documents
//! - The resource registry and relationship declarations
//! - Configuration and error types

pub use couchlayer_core::{
    client::{CouchClient, DocumentMeta, ViewOptions, ViewResult, ViewRow, WriteReceipt},
    config::{ConnectionConfig, Credentials},
    connection::Connection,
    design::{DesignDocument, ViewDef, design_id},
    error::{CouchError, CouchResult},
    record::Record,
    registry::{FilterSpec, PropertyKind, PropertySpec, ResourceRegistry, ResourceType},
    relations::{BindOptions, Related, RelationKind, RelationshipDescriptor},
};

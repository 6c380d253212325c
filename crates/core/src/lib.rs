//! Core types for relata
//!
//! This crate defines the foundational types used by the tracking layer:
//! - ObjectId: Identity of a domain object (class + key)
//! - RelationDefinition / RelationEndPointDefinition: Relation metadata
//! - RelationEndPointId: Address of one side of a relation for one object
//! - Error: Error type hierarchy
//! - TransactionEventSink: Notification target for relation changes
//! - TrackingConfig: `relata.toml` configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod events;
pub mod metadata;
pub mod types;

pub use config::{ChangeDetection, TrackingConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use events::{
    CollectionChange, NullEventSink, RecordedEvent, RecordingEventSink, TransactionEventSink,
};
pub use metadata::{
    Cardinality, EndPointDefinition, RelationDefinition, RelationEndPointDefinition,
    RelationEndPointId, RelationKind,
};
pub use types::{display_related, ClassId, ObjectId, ObjectKey};

//! Relation end-point tracking for relata
//!
//! This crate keeps both sides of bidirectional object relations consistent
//! inside one transaction:
//! - RelationEndPoint: Real, virtual object and collection end points
//! - load_state: Lazy loading of virtual end points
//! - commands: Three-phase mutations and their expansion to opposite sides
//! - RelationEndPointManager: Arena and provider of all end points
//! - sync: Detection and repair of out-of-sync relation sides

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;
pub mod data;
pub mod end_point;
pub mod load_state;
pub mod manager;
pub mod provider;
pub mod sync;

#[cfg(any(test, feature = "testing"))]
#[allow(missing_docs)]
pub mod testing;

pub use commands::{DataManagementCommand, ExpandedCommand, RelationEndPointTouchCommand};
pub use data::{
    CollectionEndPointDataManager, DefaultDataManagerFactory, EndPointDataManagerFactory,
    VirtualObjectEndPointDataManager,
};
pub use end_point::{CollectionEndPoint, RealObjectEndPoint, RelationEndPoint, VirtualObjectEndPoint};
pub use load_state::{
    CollectionLoadState, EndPointLoader, IncompleteLoadState, LoadedEndPointData,
    VirtualObjectLoadState,
};
pub use manager::RelationEndPointManager;
pub use provider::RelationEndPointProvider;

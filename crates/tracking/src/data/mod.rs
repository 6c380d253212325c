//! End-point data managers
//!
//! A data manager is the authoritative in-memory storage of one virtual end
//! point: current and original value(s) plus the bookkeeping of which
//! opposite end points back the original data. It is exclusively owned by
//! the complete load state of its end point.

pub mod collection;
pub mod object;

pub use collection::CollectionEndPointDataManager;
pub use object::VirtualObjectEndPointDataManager;

use relata_core::{ChangeDetection, RelationEndPointId};
use std::fmt;

/// Allocates fresh data managers for end points becoming complete
pub trait EndPointDataManagerFactory: Send + Sync + fmt::Debug {
    /// New, empty data manager for a virtual object end point
    fn create_virtual_object_data_manager(
        &self,
        end_point_id: &RelationEndPointId,
    ) -> VirtualObjectEndPointDataManager;

    /// New, empty data manager for a collection end point
    fn create_collection_data_manager(
        &self,
        end_point_id: &RelationEndPointId,
    ) -> CollectionEndPointDataManager;
}

/// Factory creating data managers with a fixed change detection strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDataManagerFactory {
    change_detection: ChangeDetection,
}

impl DefaultDataManagerFactory {
    /// Factory whose collection managers use `change_detection`
    pub fn new(change_detection: ChangeDetection) -> Self {
        Self { change_detection }
    }

    /// Strategy handed to every collection data manager
    pub fn change_detection(&self) -> ChangeDetection {
        self.change_detection
    }
}

impl EndPointDataManagerFactory for DefaultDataManagerFactory {
    fn create_virtual_object_data_manager(
        &self,
        end_point_id: &RelationEndPointId,
    ) -> VirtualObjectEndPointDataManager {
        VirtualObjectEndPointDataManager::new(end_point_id.clone())
    }

    fn create_collection_data_manager(
        &self,
        end_point_id: &RelationEndPointId,
    ) -> CollectionEndPointDataManager {
        CollectionEndPointDataManager::new(end_point_id.clone(), self.change_detection)
    }
}

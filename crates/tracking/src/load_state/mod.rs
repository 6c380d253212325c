//! Lazy-load state machine of virtual end points
//!
//! Every virtual end point is in exactly one of two states:
//!
//! - **Incomplete**: the data is unknown. Real end points pointing at the
//!   end point are buffered ("unsynchronized opposite end points") until the
//!   data arrives.
//! - **Complete**: a data manager holds the data. Buffered end points have
//!   been replayed into it; the ones the loaded data does not mention stay
//!   registered as unsynchronized.
//!
//! The transition is one-directional. `ensure_data_complete` asks the
//! `EndPointLoader` for the data; `mark_data_complete` takes data supplied by
//! a bulk-fetch collaborator. Either way the new complete state is built from
//! the buffer first and then replaces the incomplete state in one
//! assignment, so a failed replay or load leaves the end point incomplete and
//! retryable.

pub mod collection;
pub mod object;

pub use collection::{CollectionLoadState, CompleteCollectionLoadState};
pub use object::{CompleteVirtualObjectLoadState, VirtualObjectLoadState};

use crate::data::EndPointDataManagerFactory;
use relata_core::{Error, ObjectId, RelationEndPointId, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Data of one virtual end point as delivered by the persistence layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedEndPointData {
    /// Related object of a virtual object end point
    Object(Option<ObjectId>),
    /// Related objects of a collection end point, in order
    Collection(Vec<ObjectId>),
}

/// Fetches the data of virtual end points from the backing store
///
/// Loads are synchronous; an implementation performing I/O blocks the
/// calling thread.
pub trait EndPointLoader: Send + Sync + fmt::Debug {
    /// Load the data of the virtual end point `end_point_id`
    ///
    /// # Errors
    /// Implementations report failures as `Error::Load`; they are propagated
    /// unchanged.
    fn load_end_point_data(&self, end_point_id: &RelationEndPointId) -> Result<LoadedEndPointData>;
}

/// State of a virtual end point whose data is not known yet
#[derive(Debug, Clone)]
pub struct IncompleteLoadState {
    loader: Arc<dyn EndPointLoader>,
    data_manager_factory: Arc<dyn EndPointDataManagerFactory>,
    unsynchronized_opposite_end_points: BTreeMap<ObjectId, RelationEndPointId>,
}

impl IncompleteLoadState {
    /// Empty incomplete state
    pub fn new(
        loader: Arc<dyn EndPointLoader>,
        data_manager_factory: Arc<dyn EndPointDataManagerFactory>,
    ) -> Self {
        Self {
            loader,
            data_manager_factory,
            unsynchronized_opposite_end_points: BTreeMap::new(),
        }
    }

    /// Factory used to create the data manager on completion
    pub fn data_manager_factory(&self) -> &dyn EndPointDataManagerFactory {
        self.data_manager_factory.as_ref()
    }

    /// Real end points buffered for replay, ordered by owning object
    pub fn unsynchronized_opposite_end_points(&self) -> impl Iterator<Item = &RelationEndPointId> {
        self.unsynchronized_opposite_end_points.values()
    }

    /// Buffered end point owned by `object_id`, if any
    pub fn buffered_end_point(&self, object_id: &ObjectId) -> Option<&RelationEndPointId> {
        self.unsynchronized_opposite_end_points.get(object_id)
    }

    /// True if `opposite_end_point` is buffered
    pub fn contains_opposite_end_point(&self, opposite_end_point: &RelationEndPointId) -> bool {
        self.unsynchronized_opposite_end_points
            .get(opposite_end_point.object_id())
            .is_some_and(|id| id == opposite_end_point)
    }

    /// Buffer a real end point pointing at this end point
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the end point is already buffered.
    pub fn register_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        let object_id = opposite_end_point.object_id().clone();
        if self.unsynchronized_opposite_end_points.contains_key(&object_id) {
            return Err(Error::invalid_operation(format!(
                "The opposite end point '{}' has already been registered for '{}'.",
                opposite_end_point, end_point_id
            )));
        }
        debug!(
            target: "relata::load",
            end_point = %end_point_id,
            opposite = %opposite_end_point,
            "Buffered opposite end point of incomplete end point"
        );
        self.unsynchronized_opposite_end_points
            .insert(object_id, opposite_end_point);
        Ok(())
    }

    /// Remove a buffered real end point
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the end point is not buffered.
    pub fn unregister_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: &RelationEndPointId,
    ) -> Result<()> {
        if !self.contains_opposite_end_point(opposite_end_point) {
            return Err(Error::invalid_operation(format!(
                "The opposite end point '{}' has not been registered for '{}'.",
                opposite_end_point, end_point_id
            )));
        }
        self.unsynchronized_opposite_end_points
            .remove(opposite_end_point.object_id());
        Ok(())
    }

    /// Ask the loader for the data of `end_point_id`
    pub(crate) fn load(&self, end_point_id: &RelationEndPointId) -> Result<LoadedEndPointData> {
        debug!(target: "relata::load", end_point = %end_point_id, "Loading end point data");
        self.loader.load_end_point_data(end_point_id)
    }
}

/// Partition of the buffered end points against the loaded items
///
/// Returns, for every loaded item, the buffered end point owned by it (if
/// any), followed by the buffered end points no loaded item matches.
pub(crate) fn replay_plan<'a>(
    buffer: &'a IncompleteLoadState,
    items: &'a [ObjectId],
) -> (
    Vec<(&'a ObjectId, Option<&'a RelationEndPointId>)>,
    Vec<&'a RelationEndPointId>,
) {
    let matched = items
        .iter()
        .map(|item| (item, buffer.buffered_end_point(item)))
        .collect();
    let leftover = buffer
        .unsynchronized_opposite_end_points
        .iter()
        .filter(|(object_id, _)| !items.contains(object_id))
        .map(|(_, id)| id)
        .collect();
    (matched, leftover)
}

pub(crate) fn incomplete_error(end_point_id: &RelationEndPointId) -> Error {
    Error::invalid_operation(format!(
        "The data of end point '{}' is not complete.",
        end_point_id
    ))
}

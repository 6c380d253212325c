//! Load states of virtual object end points

use super::{incomplete_error, replay_plan, IncompleteLoadState, LoadedEndPointData};
use crate::commands::{
    DataManagementCommand, ObjectEndPointDeleteCommand, ObjectEndPointSetCommand,
    ObjectEndPointSetSameCommand,
};
use crate::data::VirtualObjectEndPointDataManager;
use crate::provider::RelationEndPointProvider;
use relata_core::{
    display_related, Error, ObjectId, RelationEndPointId, Result, TransactionEventSink,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Load state of a virtual object end point
#[derive(Debug, Clone)]
pub enum VirtualObjectLoadState {
    /// Data not loaded yet
    Incomplete(IncompleteLoadState),
    /// Data held by a data manager
    Complete(CompleteVirtualObjectLoadState),
}

impl VirtualObjectLoadState {
    /// True once the data is known
    pub fn is_data_complete(&self) -> bool {
        matches!(self, VirtualObjectLoadState::Complete(_))
    }

    /// The complete state, if the data is known
    pub fn complete(&self) -> Option<&CompleteVirtualObjectLoadState> {
        match self {
            VirtualObjectLoadState::Complete(complete) => Some(complete),
            VirtualObjectLoadState::Incomplete(_) => None,
        }
    }

    pub(crate) fn require_complete(
        &self,
        end_point_id: &RelationEndPointId,
    ) -> Result<&CompleteVirtualObjectLoadState> {
        self.complete()
            .ok_or_else(|| incomplete_error(end_point_id))
    }

    pub(crate) fn require_complete_mut(
        &mut self,
        end_point_id: &RelationEndPointId,
    ) -> Result<&mut CompleteVirtualObjectLoadState> {
        match self {
            VirtualObjectLoadState::Complete(complete) => Ok(complete),
            VirtualObjectLoadState::Incomplete(_) => Err(incomplete_error(end_point_id)),
        }
    }

    /// Load the data through the loader unless it is already complete
    ///
    /// # Errors
    /// Propagates loader failures; the state stays incomplete.
    pub fn ensure_data_complete(&mut self, end_point_id: &RelationEndPointId) -> Result<()> {
        let data = match self {
            VirtualObjectLoadState::Complete(_) => return Ok(()),
            VirtualObjectLoadState::Incomplete(incomplete) => incomplete.load(end_point_id)?,
        };
        match data {
            LoadedEndPointData::Object(item) => self.mark_data_complete(end_point_id, item),
            LoadedEndPointData::Collection(_) => Err(Error::load(
                end_point_id,
                "The loader returned collection data for a virtual object end point.",
            )),
        }
    }

    /// Complete the data with `item` without using the loader
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the data is already complete, or
    /// if replaying the buffered end points fails.
    pub fn mark_data_complete(
        &mut self,
        end_point_id: &RelationEndPointId,
        item: Option<ObjectId>,
    ) -> Result<()> {
        let complete = match self {
            VirtualObjectLoadState::Complete(_) => {
                return Err(Error::invalid_operation(format!(
                    "The data of end point '{}' is already complete.",
                    end_point_id
                )))
            }
            VirtualObjectLoadState::Incomplete(incomplete) => {
                CompleteVirtualObjectLoadState::from_incomplete(end_point_id, incomplete, item)?
            }
        };
        debug!(
            target: "relata::load",
            end_point = %end_point_id,
            value = %display_related(complete.get_data()),
            unsynchronized = complete.unsynchronized_opposite_end_points.len(),
            "Virtual object end point complete"
        );
        *self = VirtualObjectLoadState::Complete(complete);
        Ok(())
    }

    /// Register a real end point whose original value is this end point's owner
    pub fn register_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        match self {
            VirtualObjectLoadState::Incomplete(incomplete) => {
                incomplete.register_original_opposite_end_point(end_point_id, opposite_end_point)
            }
            VirtualObjectLoadState::Complete(complete) => {
                complete.register_original_opposite_end_point(end_point_id, opposite_end_point)
            }
        }
    }

    /// Inverse of `register_original_opposite_end_point`
    pub fn unregister_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: &RelationEndPointId,
    ) -> Result<()> {
        match self {
            VirtualObjectLoadState::Incomplete(incomplete) => {
                incomplete.unregister_original_opposite_end_point(end_point_id, opposite_end_point)
            }
            VirtualObjectLoadState::Complete(complete) => {
                complete.unregister_original_opposite_end_point(end_point_id, opposite_end_point)
            }
        }
    }

    /// Mark a real end point as agreeing with this end point
    ///
    /// While incomplete the end point is only buffered for replay.
    pub fn synchronize_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        match self {
            VirtualObjectLoadState::Incomplete(incomplete) => {
                if incomplete.contains_opposite_end_point(&opposite_end_point) {
                    return Ok(());
                }
                incomplete.register_original_opposite_end_point(end_point_id, opposite_end_point)
            }
            VirtualObjectLoadState::Complete(complete) => {
                complete.synchronize_opposite_end_point(end_point_id, opposite_end_point)
            }
        }
    }
}

/// Known data of a virtual object end point
#[derive(Debug, Clone)]
pub struct CompleteVirtualObjectLoadState {
    data_manager: VirtualObjectEndPointDataManager,
    unsynchronized_opposite_end_points: FxHashMap<ObjectId, RelationEndPointId>,
}

impl CompleteVirtualObjectLoadState {
    /// Complete state around an existing data manager
    pub fn new(data_manager: VirtualObjectEndPointDataManager) -> Self {
        Self {
            data_manager,
            unsynchronized_opposite_end_points: FxHashMap::default(),
        }
    }

    /// Build the complete state from a buffer and the loaded value
    ///
    /// A buffered end point owned by the loaded object backs the original
    /// value; all other buffered end points stay unsynchronized.
    fn from_incomplete(
        end_point_id: &RelationEndPointId,
        incomplete: &IncompleteLoadState,
        item: Option<ObjectId>,
    ) -> Result<Self> {
        let mut data_manager = incomplete
            .data_manager_factory()
            .create_virtual_object_data_manager(end_point_id);
        let items: Vec<ObjectId> = item.into_iter().collect();
        let (matched, leftover) = replay_plan(incomplete, &items);

        for (item, opposite_end_point) in matched {
            match opposite_end_point {
                Some(opposite) => data_manager.register_original_opposite_end_point(opposite.clone())?,
                None => data_manager.register_original_item_without_end_point(item.clone())?,
            }
        }

        let mut unsynchronized_opposite_end_points = FxHashMap::default();
        for opposite in leftover {
            warn!(
                target: "relata::sync",
                end_point = %end_point_id,
                opposite = %opposite,
                "Opposite end point is out of sync with loaded data"
            );
            unsynchronized_opposite_end_points
                .insert(opposite.object_id().clone(), opposite.clone());
        }

        Ok(Self {
            data_manager,
            unsynchronized_opposite_end_points,
        })
    }

    /// The data manager
    pub fn data_manager(&self) -> &VirtualObjectEndPointDataManager {
        &self.data_manager
    }

    pub(crate) fn data_manager_mut(&mut self) -> &mut VirtualObjectEndPointDataManager {
        &mut self.data_manager
    }

    /// Current related object
    pub fn get_data(&self) -> Option<&ObjectId> {
        self.data_manager.current_value()
    }

    /// Related object as of the last commit
    pub fn get_original_data(&self) -> Option<&ObjectId> {
        self.data_manager.original_value()
    }

    /// True if the current value differs from the original value
    pub fn has_changed(&self) -> bool {
        self.data_manager.has_data_changed()
    }

    /// False while an original item lacks its opposite end point
    pub fn is_synchronized(&self) -> bool {
        self.data_manager.original_item_without_end_point().is_none()
    }

    /// Real end points pointing here that the data does not reflect
    pub fn unsynchronized_opposite_end_points(&self) -> impl Iterator<Item = &RelationEndPointId> {
        self.unsynchronized_opposite_end_points.values()
    }

    /// True if `opposite_end_point` is registered as unsynchronized
    pub fn is_unsynchronized_opposite(&self, opposite_end_point: &RelationEndPointId) -> bool {
        self.unsynchronized_opposite_end_points
            .get(opposite_end_point.object_id())
            .is_some_and(|id| id == opposite_end_point)
    }

    /// True if `opposite_end_point` is registered, synchronized or not
    pub fn contains_opposite_end_point(&self, opposite_end_point: &RelationEndPointId) -> bool {
        self.is_unsynchronized_opposite(opposite_end_point)
            || self.data_manager.original_opposite_end_point() == Some(opposite_end_point)
    }

    fn register_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        if self.data_manager.original_item_without_end_point() == Some(opposite_end_point.object_id()) {
            debug!(
                target: "relata::sync",
                end_point = %end_point_id,
                opposite = %opposite_end_point,
                "Opposite end point backs original item"
            );
            return self
                .data_manager
                .register_original_opposite_end_point(opposite_end_point);
        }
        if self.contains_opposite_end_point(&opposite_end_point) {
            return Err(Error::invalid_operation(format!(
                "The opposite end point '{}' has already been registered for '{}'.",
                opposite_end_point, end_point_id
            )));
        }
        warn!(
            target: "relata::sync",
            end_point = %end_point_id,
            opposite = %opposite_end_point,
            "Opposite end point registered as unsynchronized"
        );
        self.unsynchronized_opposite_end_points
            .insert(opposite_end_point.object_id().clone(), opposite_end_point);
        Ok(())
    }

    fn unregister_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: &RelationEndPointId,
    ) -> Result<()> {
        if self.is_unsynchronized_opposite(opposite_end_point) {
            self.unsynchronized_opposite_end_points
                .remove(opposite_end_point.object_id());
            return Ok(());
        }
        debug!(
            target: "relata::sync",
            end_point = %end_point_id,
            opposite = %opposite_end_point,
            "Unregistering original opposite end point"
        );
        self.data_manager
            .unregister_original_opposite_end_point(opposite_end_point)
    }

    fn synchronize_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        if let Some(registered) = self.data_manager.original_opposite_end_point() {
            if registered == &opposite_end_point {
                return Ok(());
            }
            return Err(Error::invalid_operation(format!(
                "The end point '{}' cannot be synchronized with '{}' because the virtual relation \
                 property already refers to another object ('{}').",
                opposite_end_point,
                end_point_id,
                registered.object_id()
            )));
        }
        if let Some(item) = self.data_manager.original_item_without_end_point().cloned() {
            self.data_manager
                .unregister_original_item_without_end_point(&item)?;
        }
        let object_id = opposite_end_point.object_id().clone();
        self.data_manager
            .register_original_opposite_end_point(opposite_end_point)?;
        self.unsynchronized_opposite_end_points.remove(&object_id);
        debug!(
            target: "relata::sync",
            end_point = %end_point_id,
            opposite = %object_id,
            "Synchronized opposite end point"
        );
        Ok(())
    }

    /// Drop an original item that has no opposite end point
    pub fn synchronize(&mut self, end_point_id: &RelationEndPointId) -> Result<()> {
        if let Some(item) = self.data_manager.original_item_without_end_point().cloned() {
            debug!(
                target: "relata::sync",
                end_point = %end_point_id,
                item = %item,
                "Dropping original item without end point"
            );
            self.data_manager
                .unregister_original_item_without_end_point(&item)?;
        }
        Ok(())
    }

    /// Command setting the related object to `new_value`
    ///
    /// # Errors
    /// Returns `Error::OutOfSync` if the original value lacks its opposite
    /// end point, or if `new_value`'s end point is unsynchronized with this
    /// one.
    pub fn create_set_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
        new_value: Option<ObjectId>,
    ) -> Result<DataManagementCommand> {
        if let Some(item) = self.data_manager.original_item_without_end_point() {
            return Err(Error::out_of_sync(
                end_point_id,
                format!(
                    "The relation property cannot be set to '{}' because its original value '{}' \
                     has no opposite end point.",
                    display_related(new_value.as_ref()),
                    item
                ),
            ));
        }
        let old_value = self.data_manager.current_value().cloned();
        if old_value == new_value {
            return ObjectEndPointSetSameCommand::new(
                end_point_id.clone(),
                old_value,
                new_value,
                Arc::clone(event_sink),
            )
            .map(DataManagementCommand::ObjectSetSame);
        }
        if let Some(new_related) = &new_value {
            if self.unsynchronized_opposite_end_points.contains_key(new_related) {
                return Err(Error::out_of_sync(
                    end_point_id,
                    format!(
                        "The relation property cannot be set to '{}' because the opposite \
                         property of that object is out of sync with it.",
                        new_related
                    ),
                ));
            }
        }
        ObjectEndPointSetCommand::new(
            end_point_id.clone(),
            old_value,
            new_value,
            end_point_id.definition().relation_kind(),
            Arc::clone(event_sink),
        )
        .map(DataManagementCommand::ObjectSet)
    }

    /// Command clearing the related object when the owner is deleted
    ///
    /// # Errors
    /// Returns `Error::OutOfSync` if the original value lacks its opposite end
    /// point or an unsynchronized opposite end point exists.
    pub fn create_delete_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
    ) -> Result<DataManagementCommand> {
        if self.data_manager.original_item_without_end_point().is_some()
            || !self.unsynchronized_opposite_end_points.is_empty()
        {
            return Err(Error::out_of_sync(
                end_point_id,
                format!("The object '{}' cannot be deleted.", end_point_id.object_id()),
            ));
        }
        Ok(DataManagementCommand::ObjectDelete(
            ObjectEndPointDeleteCommand::new(
                end_point_id.clone(),
                self.data_manager.current_value().cloned(),
                Arc::clone(event_sink),
            )?,
        ))
    }

    /// Make the current value the original value
    pub fn commit(&mut self) {
        self.data_manager.commit();
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        self.data_manager.rollback();
    }

    /// Adopt the current value of the same end point in a subordinate transaction
    pub fn set_data_from_sub_transaction(
        &mut self,
        source: &CompleteVirtualObjectLoadState,
        end_point_provider: &dyn RelationEndPointProvider,
    ) -> Result<()> {
        self.data_manager
            .set_data_from_sub_transaction(&source.data_manager, end_point_provider)
    }
}

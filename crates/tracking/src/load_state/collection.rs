//! Load states of collection end points

use super::{incomplete_error, replay_plan, IncompleteLoadState, LoadedEndPointData};
use crate::commands::{
    CollectionEndPointDeleteCommand, CollectionEndPointInsertCommand,
    CollectionEndPointRemoveCommand, CollectionEndPointReplaceCommand,
    CollectionEndPointReplaceSameCommand, CollectionEndPointSetCollectionCommand,
    DataManagementCommand,
};
use crate::data::collection::check_unique;
use crate::data::CollectionEndPointDataManager;
use crate::provider::RelationEndPointProvider;
use relata_core::{Error, ObjectId, RelationEndPointId, Result, TransactionEventSink};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Load state of a collection end point
#[derive(Debug, Clone)]
pub enum CollectionLoadState {
    /// Data not loaded yet
    Incomplete(IncompleteLoadState),
    /// Data held by a data manager
    Complete(CompleteCollectionLoadState),
}

impl CollectionLoadState {
    /// True once the data is known
    pub fn is_data_complete(&self) -> bool {
        matches!(self, CollectionLoadState::Complete(_))
    }

    /// The complete state, if the data is known
    pub fn complete(&self) -> Option<&CompleteCollectionLoadState> {
        match self {
            CollectionLoadState::Complete(complete) => Some(complete),
            CollectionLoadState::Incomplete(_) => None,
        }
    }

    pub(crate) fn require_complete(
        &self,
        end_point_id: &RelationEndPointId,
    ) -> Result<&CompleteCollectionLoadState> {
        self.complete()
            .ok_or_else(|| incomplete_error(end_point_id))
    }

    pub(crate) fn require_complete_mut(
        &mut self,
        end_point_id: &RelationEndPointId,
    ) -> Result<&mut CompleteCollectionLoadState> {
        match self {
            CollectionLoadState::Complete(complete) => Ok(complete),
            CollectionLoadState::Incomplete(_) => Err(incomplete_error(end_point_id)),
        }
    }

    /// Load the data through the loader unless it is already complete
    ///
    /// # Errors
    /// Propagates loader failures; the state stays incomplete.
    pub fn ensure_data_complete(&mut self, end_point_id: &RelationEndPointId) -> Result<()> {
        let data = match self {
            CollectionLoadState::Complete(_) => return Ok(()),
            CollectionLoadState::Incomplete(incomplete) => incomplete.load(end_point_id)?,
        };
        match data {
            LoadedEndPointData::Collection(items) => self.mark_data_complete(end_point_id, items),
            LoadedEndPointData::Object(_) => Err(Error::load(
                end_point_id,
                "The loader returned object data for a collection end point.",
            )),
        }
    }

    /// Complete the data with `items` without using the loader
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the data is already complete or
    /// `items` contains duplicates.
    pub fn mark_data_complete(
        &mut self,
        end_point_id: &RelationEndPointId,
        items: Vec<ObjectId>,
    ) -> Result<()> {
        let complete = match self {
            CollectionLoadState::Complete(_) => {
                return Err(Error::invalid_operation(format!(
                    "The data of end point '{}' is already complete.",
                    end_point_id
                )))
            }
            CollectionLoadState::Incomplete(incomplete) => {
                CompleteCollectionLoadState::from_incomplete(end_point_id, incomplete, items)?
            }
        };
        debug!(
            target: "relata::load",
            end_point = %end_point_id,
            items = complete.get_data().len(),
            unsynchronized = complete.unsynchronized_opposite_end_points.len(),
            "Collection end point complete"
        );
        *self = CollectionLoadState::Complete(complete);
        Ok(())
    }

    /// Register a real end point whose original value is this end point's owner
    pub fn register_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        match self {
            CollectionLoadState::Incomplete(incomplete) => {
                incomplete.register_original_opposite_end_point(end_point_id, opposite_end_point)
            }
            CollectionLoadState::Complete(complete) => {
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
            CollectionLoadState::Incomplete(incomplete) => {
                incomplete.unregister_original_opposite_end_point(end_point_id, opposite_end_point)
            }
            CollectionLoadState::Complete(complete) => {
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
            CollectionLoadState::Incomplete(incomplete) => {
                if incomplete.contains_opposite_end_point(&opposite_end_point) {
                    return Ok(());
                }
                incomplete.register_original_opposite_end_point(end_point_id, opposite_end_point)
            }
            CollectionLoadState::Complete(complete) => {
                complete.synchronize_opposite_end_point(end_point_id, opposite_end_point)
            }
        }
    }
}

/// Known data of a collection end point
#[derive(Debug, Clone)]
pub struct CompleteCollectionLoadState {
    data_manager: CollectionEndPointDataManager,
    unsynchronized_opposite_end_points: FxHashMap<ObjectId, RelationEndPointId>,
}

impl CompleteCollectionLoadState {
    /// Complete state around an existing data manager
    pub fn new(data_manager: CollectionEndPointDataManager) -> Self {
        Self {
            data_manager,
            unsynchronized_opposite_end_points: FxHashMap::default(),
        }
    }

    fn from_incomplete(
        end_point_id: &RelationEndPointId,
        incomplete: &IncompleteLoadState,
        items: Vec<ObjectId>,
    ) -> Result<Self> {
        let mut data_manager = incomplete
            .data_manager_factory()
            .create_collection_data_manager(end_point_id);
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
    pub fn data_manager(&self) -> &CollectionEndPointDataManager {
        &self.data_manager
    }

    pub(crate) fn data_manager_mut(&mut self) -> &mut CollectionEndPointDataManager {
        &mut self.data_manager
    }

    /// Current items
    pub fn get_data(&self) -> &[ObjectId] {
        self.data_manager.current_items()
    }

    /// Items as of the last commit
    pub fn get_original_data(&self) -> &[ObjectId] {
        self.data_manager.original_items()
    }

    /// True if the items changed since the last commit
    pub fn has_changed(&self) -> bool {
        self.data_manager.has_data_changed()
    }

    /// False while any original item lacks its opposite end point
    pub fn is_synchronized(&self) -> bool {
        self.data_manager
            .original_items_without_end_points()
            .next()
            .is_none()
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
            || self
                .data_manager
                .contains_original_opposite_end_point(opposite_end_point)
    }

    fn register_original_opposite_end_point(
        &mut self,
        end_point_id: &RelationEndPointId,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        if self
            .data_manager
            .contains_original_item_without_end_point(opposite_end_point.object_id())
        {
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
        if self
            .data_manager
            .contains_original_opposite_end_point(&opposite_end_point)
        {
            return Ok(());
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

    /// Drop every original item that has no opposite end point
    pub fn synchronize(&mut self, end_point_id: &RelationEndPointId) -> Result<()> {
        let items: Vec<ObjectId> = self
            .data_manager
            .original_items_without_end_points()
            .cloned()
            .collect();
        for item in items {
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

    fn check_added_item(&self, end_point_id: &RelationEndPointId, item: &ObjectId) -> Result<()> {
        if self.unsynchronized_opposite_end_points.contains_key(item) {
            return Err(Error::out_of_sync(
                end_point_id,
                format!(
                    "The object '{}' cannot be added because its own opposite property is out of \
                     sync with the collection.",
                    item
                ),
            ));
        }
        Ok(())
    }

    fn check_removed_item(&self, end_point_id: &RelationEndPointId, item: &ObjectId) -> Result<()> {
        if self.unsynchronized_opposite_end_points.contains_key(item)
            || self
                .data_manager
                .contains_original_item_without_end_point(item)
        {
            return Err(Error::out_of_sync(
                end_point_id,
                format!(
                    "The object '{}' cannot be removed because it is out of sync with the \
                     collection.",
                    item
                ),
            ));
        }
        Ok(())
    }

    /// Command inserting `item` at `index`
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` for an index past the end or an
    /// item already contained, `Error::OutOfSync` if the item's end point is
    /// unsynchronized with this one.
    pub fn create_insert_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
        index: usize,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        if index > self.data_manager.len() {
            return Err(Error::contract(format!(
                "Index {} is out of range for '{}' with {} items.",
                index,
                end_point_id,
                self.data_manager.len()
            )));
        }
        if self.data_manager.contains(&item) {
            return Err(Error::contract(format!(
                "'{}' already contains a domain object with ID '{}'.",
                end_point_id, item
            )));
        }
        self.check_added_item(end_point_id, &item)?;
        Ok(DataManagementCommand::CollectionInsert(
            CollectionEndPointInsertCommand::new(
                end_point_id.clone(),
                index,
                item,
                Arc::clone(event_sink),
            )?,
        ))
    }

    /// Command appending `item`
    pub fn create_add_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        self.create_insert_command(end_point_id, event_sink, self.data_manager.len(), item)
    }

    /// Command removing `item`
    ///
    /// Removing an object that is not contained yields a no-op command.
    ///
    /// # Errors
    /// Returns `Error::OutOfSync` if the item is out of sync with this end point.
    pub fn create_remove_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        self.check_removed_item(end_point_id, &item)?;
        match self.data_manager.index_of(&item) {
            Some(index) => Ok(DataManagementCommand::CollectionRemove(
                CollectionEndPointRemoveCommand::new(
                    end_point_id.clone(),
                    index,
                    item,
                    Arc::clone(event_sink),
                )?,
            )),
            None => Ok(DataManagementCommand::Nop),
        }
    }

    /// Command replacing the item at `index` with `item`
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` for an index out of range or an item
    /// contained at another position, `Error::OutOfSync` if either item is out
    /// of sync with this end point.
    pub fn create_replace_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
        index: usize,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        let old_item = self.data_manager.current_items().get(index).cloned().ok_or_else(|| {
            Error::contract(format!(
                "Index {} is out of range for '{}' with {} items.",
                index,
                end_point_id,
                self.data_manager.len()
            ))
        })?;
        if old_item == item {
            return Ok(DataManagementCommand::CollectionReplaceSame(
                CollectionEndPointReplaceSameCommand::new(
                    end_point_id.clone(),
                    index,
                    item,
                    Arc::clone(event_sink),
                )?,
            ));
        }
        if self.data_manager.contains(&item) {
            return Err(Error::contract(format!(
                "'{}' already contains a domain object with ID '{}'.",
                end_point_id, item
            )));
        }
        self.check_removed_item(end_point_id, &old_item)?;
        self.check_added_item(end_point_id, &item)?;
        Ok(DataManagementCommand::CollectionReplace(
            CollectionEndPointReplaceCommand::new(
                end_point_id.clone(),
                index,
                old_item,
                item,
                Arc::clone(event_sink),
            )?,
        ))
    }

    /// Command replacing the whole content with `items`
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `items` contains duplicates,
    /// `Error::OutOfSync` if an added or removed item is out of sync.
    pub fn create_set_collection_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
        items: Vec<ObjectId>,
    ) -> Result<DataManagementCommand> {
        check_unique(end_point_id, &items)?;
        let current = self.data_manager.current_items();
        for removed in current.iter().filter(|item| !items.contains(item)) {
            self.check_removed_item(end_point_id, removed)?;
        }
        for added in items.iter().filter(|item| !current.contains(item)) {
            self.check_added_item(end_point_id, added)?;
        }
        Ok(DataManagementCommand::CollectionSetCollection(
            CollectionEndPointSetCollectionCommand::new(
                end_point_id.clone(),
                current,
                items,
                Arc::clone(event_sink),
            )?,
        ))
    }

    /// Command clearing the collection when the owner is deleted
    ///
    /// # Errors
    /// Returns `Error::OutOfSync` if any item lacks its opposite end point or
    /// an unsynchronized opposite end point exists.
    pub fn create_delete_command(
        &self,
        end_point_id: &RelationEndPointId,
        event_sink: &Arc<dyn TransactionEventSink>,
    ) -> Result<DataManagementCommand> {
        if !self.is_synchronized() || !self.unsynchronized_opposite_end_points.is_empty() {
            return Err(Error::out_of_sync(
                end_point_id,
                format!("The object '{}' cannot be deleted.", end_point_id.object_id()),
            ));
        }
        Ok(DataManagementCommand::CollectionDelete(
            CollectionEndPointDeleteCommand::new(
                end_point_id.clone(),
                self.data_manager.current_items().to_vec(),
                Arc::clone(event_sink),
            )?,
        ))
    }

    /// Make the current items the original items
    pub fn commit(&mut self) {
        self.data_manager.commit();
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        self.data_manager.rollback();
    }

    /// Adopt the current items of the same end point in a subordinate transaction
    pub fn set_data_from_sub_transaction(
        &mut self,
        source: &CompleteCollectionLoadState,
        end_point_provider: &dyn RelationEndPointProvider,
    ) -> Result<()> {
        self.data_manager
            .set_data_from_sub_transaction(&source.data_manager, end_point_provider)
    }
}

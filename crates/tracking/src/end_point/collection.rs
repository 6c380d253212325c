//! Collection end points (the "many" side of one-to-many relations)

use crate::commands::DataManagementCommand;
use crate::data::{CollectionEndPointDataManager, EndPointDataManagerFactory};
use crate::load_state::{
    CollectionLoadState, CompleteCollectionLoadState, EndPointLoader, IncompleteLoadState,
};
use crate::provider::RelationEndPointProvider;
use relata_core::{Error, ObjectId, RelationEndPointId, Result, TransactionEventSink};
use std::sync::Arc;

/// Ordered set of related objects derived from the opposite real end points
#[derive(Debug, Clone)]
pub struct CollectionEndPoint {
    id: RelationEndPointId,
    event_sink: Arc<dyn TransactionEventSink>,
    load_state: CollectionLoadState,
    has_been_touched: bool,
}

impl CollectionEndPoint {
    /// End point of a loaded object; its items are not known yet
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `id` is not a collection end point.
    pub fn new_incomplete(
        id: RelationEndPointId,
        event_sink: Arc<dyn TransactionEventSink>,
        loader: Arc<dyn EndPointLoader>,
        data_manager_factory: Arc<dyn EndPointDataManagerFactory>,
    ) -> Result<Self> {
        check_definition(&id)?;
        Ok(Self {
            id,
            event_sink,
            load_state: CollectionLoadState::Incomplete(IncompleteLoadState::new(
                loader,
                data_manager_factory,
            )),
            has_been_touched: false,
        })
    }

    /// End point with known items, e.g. of a new object
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `id` is not a collection end
    /// point or `data_manager` belongs to another end point.
    pub fn new_complete(
        id: RelationEndPointId,
        event_sink: Arc<dyn TransactionEventSink>,
        data_manager: CollectionEndPointDataManager,
    ) -> Result<Self> {
        check_definition(&id)?;
        if data_manager.end_point_id() != &id {
            return Err(Error::contract(format!(
                "The data manager of '{}' cannot be used for '{}'.",
                data_manager.end_point_id(),
                id
            )));
        }
        Ok(Self {
            id,
            event_sink,
            load_state: CollectionLoadState::Complete(CompleteCollectionLoadState::new(
                data_manager,
            )),
            has_been_touched: false,
        })
    }

    /// Id of this end point
    pub fn id(&self) -> &RelationEndPointId {
        &self.id
    }

    /// Sink receiving this end point's notifications
    pub fn event_sink(&self) -> &Arc<dyn TransactionEventSink> {
        &self.event_sink
    }

    /// Current load state
    pub fn load_state(&self) -> &CollectionLoadState {
        &self.load_state
    }

    /// The complete state, if the items are known
    pub fn complete_state(&self) -> Option<&CompleteCollectionLoadState> {
        self.load_state.complete()
    }

    /// True once the items are known
    pub fn is_data_complete(&self) -> bool {
        self.load_state.is_data_complete()
    }

    /// Load the items unless they are known
    pub fn ensure_data_complete(&mut self) -> Result<()> {
        self.load_state.ensure_data_complete(&self.id)
    }

    /// Complete the data with items supplied by the caller
    pub fn mark_data_complete(&mut self, items: Vec<ObjectId>) -> Result<()> {
        self.load_state.mark_data_complete(&self.id, items)
    }

    /// Current items, loading them if needed
    pub fn get_data(&mut self) -> Result<&[ObjectId]> {
        self.ensure_data_complete()?;
        Ok(self.load_state.require_complete(&self.id)?.get_data())
    }

    /// Items as of the last commit, loading them if needed
    pub fn get_original_data(&mut self) -> Result<&[ObjectId]> {
        self.ensure_data_complete()?;
        Ok(self.load_state.require_complete(&self.id)?.get_original_data())
    }

    pub(crate) fn data_manager_mut(&mut self) -> Result<&mut CollectionEndPointDataManager> {
        Ok(self
            .load_state
            .require_complete_mut(&self.id)?
            .data_manager_mut())
    }

    /// `None` while incomplete; otherwise false while any original item
    /// lacks its opposite end point
    pub fn is_synchronized(&self) -> Option<bool> {
        self.complete_state().map(|complete| complete.is_synchronized())
    }

    /// Register a real end point whose original value is this end point's owner
    pub fn register_original_opposite_end_point(
        &mut self,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        self.load_state
            .register_original_opposite_end_point(&self.id, opposite_end_point)
    }

    /// Inverse of `register_original_opposite_end_point`
    pub fn unregister_original_opposite_end_point(
        &mut self,
        opposite_end_point: &RelationEndPointId,
    ) -> Result<()> {
        self.load_state
            .unregister_original_opposite_end_point(&self.id, opposite_end_point)
    }

    /// Add a real end point's owner to the original items unless already registered
    pub fn synchronize_opposite_end_point(
        &mut self,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        self.load_state
            .synchronize_opposite_end_point(&self.id, opposite_end_point)
    }

    /// Drop every original item lacking its opposite end point
    pub fn synchronize(&mut self) -> Result<()> {
        self.ensure_data_complete()?;
        self.load_state
            .require_complete_mut(&self.id)?
            .synchronize(&self.id)
    }

    fn complete_for_command(&mut self) -> Result<&CompleteCollectionLoadState> {
        self.ensure_data_complete()?;
        self.load_state.require_complete(&self.id)
    }

    /// Command inserting `item` at `index`
    pub fn create_insert_command(
        &mut self,
        index: usize,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        let sink = Arc::clone(&self.event_sink);
        let id = self.id.clone();
        self.complete_for_command()?
            .create_insert_command(&id, &sink, index, item)
    }

    /// Command appending `item`
    pub fn create_add_command(&mut self, item: ObjectId) -> Result<DataManagementCommand> {
        let sink = Arc::clone(&self.event_sink);
        let id = self.id.clone();
        self.complete_for_command()?
            .create_add_command(&id, &sink, item)
    }

    /// Command removing `item`; a no-op if it is not contained
    pub fn create_remove_command(&mut self, item: ObjectId) -> Result<DataManagementCommand> {
        let sink = Arc::clone(&self.event_sink);
        let id = self.id.clone();
        self.complete_for_command()?
            .create_remove_command(&id, &sink, item)
    }

    /// Command replacing the item at `index`
    pub fn create_replace_command(
        &mut self,
        index: usize,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        let sink = Arc::clone(&self.event_sink);
        let id = self.id.clone();
        self.complete_for_command()?
            .create_replace_command(&id, &sink, index, item)
    }

    /// Command replacing the whole content
    pub fn create_set_collection_command(
        &mut self,
        items: Vec<ObjectId>,
    ) -> Result<DataManagementCommand> {
        let sink = Arc::clone(&self.event_sink);
        let id = self.id.clone();
        self.complete_for_command()?
            .create_set_collection_command(&id, &sink, items)
    }

    /// Command clearing the collection when the owner is deleted
    pub fn create_delete_command(&mut self) -> Result<DataManagementCommand> {
        let sink = Arc::clone(&self.event_sink);
        let id = self.id.clone();
        self.complete_for_command()?
            .create_delete_command(&id, &sink)
    }

    /// Mark the end point as accessed
    pub fn touch(&mut self) {
        self.has_been_touched = true;
    }

    /// True if touched since the last commit or rollback
    pub fn has_been_touched(&self) -> bool {
        self.has_been_touched
    }

    /// True if the items changed since the last commit
    pub fn has_changed(&self) -> bool {
        self.complete_state()
            .is_some_and(|complete| complete.has_changed())
    }

    /// Make the current items the original items
    pub fn commit(&mut self) {
        if let CollectionLoadState::Complete(complete) = &mut self.load_state {
            complete.commit();
        }
        self.has_been_touched = false;
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        if let CollectionLoadState::Complete(complete) = &mut self.load_state {
            complete.rollback();
        }
        self.has_been_touched = false;
    }

    /// Adopt the current items of the same end point in a subordinate transaction
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if either end point is incomplete.
    pub fn set_data_from_sub_transaction(
        &mut self,
        source: &CollectionEndPoint,
        end_point_provider: &dyn RelationEndPointProvider,
    ) -> Result<()> {
        let source_state = source.load_state.require_complete(&source.id)?;
        self.load_state
            .require_complete_mut(&self.id)?
            .set_data_from_sub_transaction(source_state, end_point_provider)?;
        if source.has_been_touched {
            self.touch();
        }
        Ok(())
    }
}

fn check_definition(id: &RelationEndPointId) -> Result<()> {
    if !id.definition().is_collection() {
        return Err(Error::contract(format!(
            "'{}' is not a collection end point.",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::OrderModel;
    use relata_core::ChangeDetection;

    fn incomplete(model: &OrderModel, n: i64) -> CollectionEndPoint {
        CollectionEndPoint::new_incomplete(
            model.customer_orders_of(n),
            model.event_sink(),
            model.loader(),
            model.data_manager_factory(),
        )
        .unwrap()
    }

    #[test]
    fn test_command_creation_loads_items() {
        let model = OrderModel::new();
        model
            .loader()
            .set_collection(model.customer_orders_of(1), vec![model.order(1)]);
        let mut end_point = incomplete(&model, 1);
        end_point
            .register_original_opposite_end_point(model.order_customer_of(1))
            .unwrap();

        let command = end_point.create_add_command(model.order(2)).unwrap();
        assert!(matches!(command, DataManagementCommand::CollectionInsert(_)));
        assert!(end_point.is_data_complete());
        assert_eq!(end_point.is_synchronized(), Some(true));
        assert_eq!(model.loader().load_count(&model.customer_orders_of(1)), 1);
    }

    #[test]
    fn test_failed_load_propagates_and_stays_incomplete() {
        let model = OrderModel::new();
        model.loader().fail(model.customer_orders_of(1), "timeout");
        let mut end_point = incomplete(&model, 1);

        let err = end_point.get_data().unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        assert!(!end_point.is_data_complete());
    }

    #[test]
    fn test_new_complete_is_empty_and_unchanged() {
        let model = OrderModel::new();
        let id = model.customer_orders_of(1);
        let mut end_point = CollectionEndPoint::new_complete(
            id.clone(),
            model.event_sink(),
            CollectionEndPointDataManager::new(id, ChangeDetection::Set),
        )
        .unwrap();

        assert!(end_point.get_data().unwrap().is_empty());
        assert!(!end_point.has_changed());
        assert_eq!(end_point.is_synchronized(), Some(true));
    }

    #[test]
    fn test_virtual_object_definition_rejected() {
        let model = OrderModel::new();
        let result = CollectionEndPoint::new_incomplete(
            model.order_ticket_of(1),
            model.event_sink(),
            model.loader(),
            model.data_manager_factory(),
        );
        assert!(result.unwrap_err().is_contract_violation());
    }
}

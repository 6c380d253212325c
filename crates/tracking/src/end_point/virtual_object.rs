//! Virtual object end points (the non-key side of one-to-one relations)

use crate::commands::DataManagementCommand;
use crate::data::{EndPointDataManagerFactory, VirtualObjectEndPointDataManager};
use crate::load_state::{
    CompleteVirtualObjectLoadState, EndPointLoader, IncompleteLoadState, VirtualObjectLoadState,
};
use crate::provider::RelationEndPointProvider;
use relata_core::{Error, ObjectId, RelationEndPointId, Result, TransactionEventSink};
use std::sync::Arc;

/// Scalar end point whose value is derived from the opposite real end point
#[derive(Debug, Clone)]
pub struct VirtualObjectEndPoint {
    id: RelationEndPointId,
    event_sink: Arc<dyn TransactionEventSink>,
    load_state: VirtualObjectLoadState,
    has_been_touched: bool,
}

impl VirtualObjectEndPoint {
    /// End point of a loaded object; its data is not known yet
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `id` is not a virtual object end point.
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
            load_state: VirtualObjectLoadState::Incomplete(IncompleteLoadState::new(
                loader,
                data_manager_factory,
            )),
            has_been_touched: false,
        })
    }

    /// End point with known data, e.g. of a new object
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `id` is not a virtual object end
    /// point or `data_manager` belongs to another end point.
    pub fn new_complete(
        id: RelationEndPointId,
        event_sink: Arc<dyn TransactionEventSink>,
        data_manager: VirtualObjectEndPointDataManager,
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
            load_state: VirtualObjectLoadState::Complete(CompleteVirtualObjectLoadState::new(
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
    pub fn load_state(&self) -> &VirtualObjectLoadState {
        &self.load_state
    }

    /// The complete state, if the data is known
    pub fn complete_state(&self) -> Option<&CompleteVirtualObjectLoadState> {
        self.load_state.complete()
    }

    /// True once the data is known
    pub fn is_data_complete(&self) -> bool {
        self.load_state.is_data_complete()
    }

    /// Load the data unless it is known
    pub fn ensure_data_complete(&mut self) -> Result<()> {
        self.load_state.ensure_data_complete(&self.id)
    }

    /// Complete the data with a value supplied by the caller
    pub fn mark_data_complete(&mut self, item: Option<ObjectId>) -> Result<()> {
        self.load_state.mark_data_complete(&self.id, item)
    }

    /// Current related object, loading the data if needed
    pub fn get_data(&mut self) -> Result<Option<&ObjectId>> {
        self.ensure_data_complete()?;
        Ok(self.load_state.require_complete(&self.id)?.get_data())
    }

    /// Original related object, loading the data if needed
    pub fn get_original_data(&mut self) -> Result<Option<&ObjectId>> {
        self.ensure_data_complete()?;
        Ok(self.load_state.require_complete(&self.id)?.get_original_data())
    }

    pub(crate) fn data_manager_mut(&mut self) -> Result<&mut VirtualObjectEndPointDataManager> {
        Ok(self
            .load_state
            .require_complete_mut(&self.id)?
            .data_manager_mut())
    }

    /// `None` while incomplete; otherwise false while the original value
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

    /// Make a real end point the backing of the original value
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if another end point already backs it.
    pub fn synchronize_opposite_end_point(
        &mut self,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        self.load_state
            .synchronize_opposite_end_point(&self.id, opposite_end_point)
    }

    /// Drop an original value lacking its opposite end point
    pub fn synchronize(&mut self) -> Result<()> {
        self.ensure_data_complete()?;
        self.load_state
            .require_complete_mut(&self.id)?
            .synchronize(&self.id)
    }

    /// Command setting the related object, loading the data if needed
    pub fn create_set_command(&mut self, new_value: Option<ObjectId>) -> Result<DataManagementCommand> {
        self.ensure_data_complete()?;
        self.load_state
            .require_complete(&self.id)?
            .create_set_command(&self.id, &self.event_sink, new_value)
    }

    /// Command clearing the related object on deletion, loading the data if needed
    pub fn create_delete_command(&mut self) -> Result<DataManagementCommand> {
        self.ensure_data_complete()?;
        self.load_state
            .require_complete(&self.id)?
            .create_delete_command(&self.id, &self.event_sink)
    }

    /// Mark the end point as accessed
    pub fn touch(&mut self) {
        self.has_been_touched = true;
    }

    /// True if touched since the last commit or rollback
    pub fn has_been_touched(&self) -> bool {
        self.has_been_touched
    }

    /// True if the current value differs from the original value
    pub fn has_changed(&self) -> bool {
        self.complete_state()
            .is_some_and(|complete| complete.has_changed())
    }

    /// Make the current value the original value
    pub fn commit(&mut self) {
        if let VirtualObjectLoadState::Complete(complete) = &mut self.load_state {
            complete.commit();
        }
        self.has_been_touched = false;
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        if let VirtualObjectLoadState::Complete(complete) = &mut self.load_state {
            complete.rollback();
        }
        self.has_been_touched = false;
    }

    /// Adopt the current value of the same end point in a subordinate transaction
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if either end point is incomplete.
    pub fn set_data_from_sub_transaction(
        &mut self,
        source: &VirtualObjectEndPoint,
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
    if !id.definition().is_virtual_object() {
        return Err(Error::contract(format!(
            "'{}' is not a virtual object end point.",
            id
        )));
    }
    Ok(())
}

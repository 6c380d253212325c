//! Real (foreign-key) object end points
//!
//! A real end point's value is the foreign key stored on the owning object,
//! so its data is always complete. Whether it agrees with the opposite
//! virtual end point is derived from that end point's registrations.

use super::check_related_class;
use crate::commands::{
    DataManagementCommand, ObjectEndPointDeleteCommand, ObjectEndPointSetCommand,
    ObjectEndPointSetSameCommand,
};
use crate::provider::RelationEndPointProvider;
use relata_core::{display_related, Error, ObjectId, RelationEndPointId, Result, TransactionEventSink};
use std::sync::Arc;

/// End point holding the foreign key of a relation
#[derive(Debug, Clone)]
pub struct RealObjectEndPoint {
    id: RelationEndPointId,
    event_sink: Arc<dyn TransactionEventSink>,
    original_opposite_object_id: Option<ObjectId>,
    opposite_object_id: Option<ObjectId>,
    has_been_touched: bool,
}

impl RealObjectEndPoint {
    /// Create the end point with the foreign-key value read from the store
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `id` is not a real end point or
    /// the value is not of the opposite class.
    pub fn new(
        id: RelationEndPointId,
        original_opposite_object_id: Option<ObjectId>,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        if !id.definition().is_real_object() {
            return Err(Error::contract(format!(
                "'{}' is not a real object end point.",
                id
            )));
        }
        if let Some(related) = &original_opposite_object_id {
            check_related_class(&id, related)?;
        }
        Ok(Self {
            id,
            event_sink,
            opposite_object_id: original_opposite_object_id.clone(),
            original_opposite_object_id,
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

    /// Current foreign-key value
    pub fn get_data(&self) -> Option<&ObjectId> {
        self.opposite_object_id.as_ref()
    }

    /// Foreign-key value as of the last commit
    pub fn get_original_data(&self) -> Option<&ObjectId> {
        self.original_opposite_object_id.as_ref()
    }

    /// Opposite end point of the current value; `None` when null or unidirectional
    pub fn opposite_end_point_id(&self) -> Option<RelationEndPointId> {
        self.opposite_for(self.opposite_object_id.as_ref())
    }

    /// Opposite end point of the original value; this is where the end point
    /// is registered
    pub fn original_opposite_end_point_id(&self) -> Option<RelationEndPointId> {
        self.opposite_for(self.original_opposite_object_id.as_ref())
    }

    fn opposite_for(&self, related: Option<&ObjectId>) -> Option<RelationEndPointId> {
        // the class of every stored value is checked on the way in
        related.and_then(|related| self.id.opposite_for(related).ok().flatten())
    }

    pub(crate) fn set_opposite_object_id(&mut self, value: Option<ObjectId>) {
        self.opposite_object_id = value;
    }

    /// Whether the opposite virtual end point agrees with this end point
    ///
    /// Returns `None` while the opposite end point's data is not loaded.
    pub fn is_synchronized(&self, provider: &dyn RelationEndPointProvider) -> Option<bool> {
        let Some(opposite) = self.original_opposite_end_point_id() else {
            return Some(true);
        };
        provider
            .get_end_point_without_loading(&opposite)
            .and_then(|end_point| end_point.is_unsynchronized_opposite(&self.id))
            .map(|unsynchronized| !unsynchronized)
    }

    /// Command setting the foreign key to `new_value`
    ///
    /// # Errors
    /// Returns `Error::OutOfSync` if the end point is unsynchronized.
    pub fn create_set_command(
        &self,
        new_value: Option<ObjectId>,
        is_synchronized: bool,
    ) -> Result<DataManagementCommand> {
        if !is_synchronized {
            return Err(Error::out_of_sync(
                &self.id,
                format!(
                    "The relation property cannot be changed to '{}'.",
                    display_related(new_value.as_ref())
                ),
            ));
        }
        if new_value == self.opposite_object_id {
            return ObjectEndPointSetSameCommand::new(
                self.id.clone(),
                self.opposite_object_id.clone(),
                new_value,
                Arc::clone(&self.event_sink),
            )
            .map(DataManagementCommand::ObjectSetSame);
        }
        ObjectEndPointSetCommand::new(
            self.id.clone(),
            self.opposite_object_id.clone(),
            new_value,
            self.id.definition().relation_kind(),
            Arc::clone(&self.event_sink),
        )
        .map(DataManagementCommand::ObjectSet)
    }

    /// Command clearing the foreign key when the owner is deleted
    ///
    /// # Errors
    /// Returns `Error::OutOfSync` if the end point is unsynchronized.
    pub fn create_delete_command(&self, is_synchronized: bool) -> Result<DataManagementCommand> {
        if !is_synchronized {
            return Err(Error::out_of_sync(
                &self.id,
                format!("The object '{}' cannot be deleted.", self.id.object_id()),
            ));
        }
        ObjectEndPointDeleteCommand::new(
            self.id.clone(),
            self.opposite_object_id.clone(),
            Arc::clone(&self.event_sink),
        )
        .map(DataManagementCommand::ObjectDelete)
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
        self.opposite_object_id != self.original_opposite_object_id
    }

    /// Make the current value the original value
    pub fn commit(&mut self) {
        self.original_opposite_object_id = self.opposite_object_id.clone();
        self.has_been_touched = false;
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        self.opposite_object_id = self.original_opposite_object_id.clone();
        self.has_been_touched = false;
    }

    /// Adopt the current value of the same end point in a subordinate transaction
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `source` is a different end point.
    pub fn set_data_from_sub_transaction(&mut self, source: &RealObjectEndPoint) -> Result<()> {
        if source.id != self.id {
            return Err(Error::contract(format!(
                "Cannot take data of '{}' into '{}'.",
                source.id, self.id
            )));
        }
        self.opposite_object_id = source.opposite_object_id.clone();
        if source.has_been_touched {
            self.touch();
        }
        Ok(())
    }
}

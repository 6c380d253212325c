//! Data manager for virtual object (scalar) end points
//!
//! Keeps the original and current related object of one virtual end point,
//! plus where the original value came from: either a registered opposite
//! real end point, or an "item without end point" whose own end point has
//! not been materialized yet.

use crate::provider::RelationEndPointProvider;
use relata_core::{display_related, Error, ObjectId, RelationEndPointId, Result};

/// Original/current storage of a virtual object end point
#[derive(Debug, Clone)]
pub struct VirtualObjectEndPointDataManager {
    end_point_id: RelationEndPointId,
    original_opposite_end_point: Option<RelationEndPointId>,
    original_item_without_end_point: Option<ObjectId>,
    original_value: Option<ObjectId>,
    current_value: Option<ObjectId>,
    current_opposite_end_point: Option<RelationEndPointId>,
}

impl VirtualObjectEndPointDataManager {
    /// Create an empty data manager for `end_point_id`
    pub fn new(end_point_id: RelationEndPointId) -> Self {
        Self {
            end_point_id,
            original_opposite_end_point: None,
            original_item_without_end_point: None,
            original_value: None,
            current_value: None,
            current_opposite_end_point: None,
        }
    }

    /// End point this manager stores data for
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Related object including pending edits
    pub fn current_value(&self) -> Option<&ObjectId> {
        self.current_value.as_ref()
    }

    /// Related object as of the last commit
    pub fn original_value(&self) -> Option<&ObjectId> {
        self.original_value.as_ref()
    }

    /// Opposite end point matching the current value, if it exists
    pub fn current_opposite_end_point(&self) -> Option<&RelationEndPointId> {
        self.current_opposite_end_point.as_ref()
    }

    /// Registered opposite end point backing the original value
    pub fn original_opposite_end_point(&self) -> Option<&RelationEndPointId> {
        self.original_opposite_end_point.as_ref()
    }

    /// Original value known without its opposite end point
    pub fn original_item_without_end_point(&self) -> Option<&ObjectId> {
        self.original_item_without_end_point.as_ref()
    }

    /// Replace the current value
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `value` is not of the opposite class.
    pub fn set_current_value(&mut self, value: Option<ObjectId>) -> Result<()> {
        self.current_opposite_end_point = match &value {
            Some(related) => self.end_point_id.opposite_for(related)?,
            None => None,
        };
        self.current_value = value;
        Ok(())
    }

    /// Register the real end point that backs the original value
    ///
    /// If the data has not changed, the current value follows.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if an original opposite end point is
    /// already registered, or an item without end point with a different
    /// identity was registered before.
    pub fn register_original_opposite_end_point(
        &mut self,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        self.check_opposite_definition(&opposite_end_point)?;
        if self.original_opposite_end_point.is_some() {
            return Err(Error::invalid_operation(format!(
                "The original opposite end point of '{}' has already been registered.",
                self.end_point_id
            )));
        }
        let item = opposite_end_point.object_id().clone();
        if let Some(registered) = &self.original_item_without_end_point {
            if registered != &item {
                return Err(Error::invalid_operation(format!(
                    "A different original opposite item ('{}') has already been registered for '{}'.",
                    registered, self.end_point_id
                )));
            }
        }

        let data_changed = self.has_data_changed();
        self.original_item_without_end_point = None;
        self.original_value = Some(item);
        self.original_opposite_end_point = Some(opposite_end_point);
        if !data_changed {
            self.current_value = self.original_value.clone();
            self.current_opposite_end_point = self.original_opposite_end_point.clone();
        }
        Ok(())
    }

    /// Inverse of `register_original_opposite_end_point`
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if `opposite_end_point` is not the
    /// registered original opposite end point.
    pub fn unregister_original_opposite_end_point(
        &mut self,
        opposite_end_point: &RelationEndPointId,
    ) -> Result<()> {
        if self.original_opposite_end_point.as_ref() != Some(opposite_end_point) {
            return Err(Error::invalid_operation(format!(
                "The original opposite end point '{}' has not been registered for '{}'.",
                opposite_end_point, self.end_point_id
            )));
        }
        let data_changed = self.has_data_changed();
        self.original_opposite_end_point = None;
        self.original_value = None;
        if !data_changed {
            self.current_value = None;
            self.current_opposite_end_point = None;
        }
        Ok(())
    }

    /// Record a related object whose opposite end point does not exist yet
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if an original item or end point is
    /// already registered.
    pub fn register_original_item_without_end_point(&mut self, item: ObjectId) -> Result<()> {
        if self.original_value.is_some() {
            return Err(Error::invalid_operation(format!(
                "An original opposite item ('{}') has already been registered for '{}'.",
                display_related(self.original_value.as_ref()),
                self.end_point_id
            )));
        }
        let data_changed = self.has_data_changed();
        self.original_value = Some(item.clone());
        self.original_item_without_end_point = Some(item);
        if !data_changed {
            self.current_value = self.original_value.clone();
            self.current_opposite_end_point = None;
        }
        Ok(())
    }

    /// Inverse of `register_original_item_without_end_point`
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if `item` is not the registered item.
    pub fn unregister_original_item_without_end_point(&mut self, item: &ObjectId) -> Result<()> {
        if self.original_item_without_end_point.as_ref() != Some(item) {
            return Err(Error::invalid_operation(format!(
                "The original item '{}' has not been registered without end point for '{}'.",
                item, self.end_point_id
            )));
        }
        let data_changed = self.has_data_changed();
        self.original_item_without_end_point = None;
        self.original_value = None;
        if !data_changed {
            self.current_value = None;
            self.current_opposite_end_point = None;
        }
        Ok(())
    }

    /// True if the current value differs from the original value
    pub fn has_data_changed(&self) -> bool {
        self.current_value != self.original_value
    }

    /// Make the current value the original value
    pub fn commit(&mut self) {
        let still_without_end_point = self.original_item_without_end_point.is_some()
            && self.current_value == self.original_item_without_end_point;
        if !still_without_end_point {
            self.original_item_without_end_point = None;
            self.original_opposite_end_point = self.current_opposite_end_point.clone();
        }
        self.original_value = self.current_value.clone();
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        self.current_value = self.original_value.clone();
        self.current_opposite_end_point = self.original_opposite_end_point.clone();
    }

    /// Adopt the current value of the same end point in a subordinate transaction
    ///
    /// The opposite end point is resolved in this transaction through
    /// `end_point_provider`; the source's end point is never reused directly.
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `source` manages a different end point.
    pub fn set_data_from_sub_transaction(
        &mut self,
        source: &VirtualObjectEndPointDataManager,
        end_point_provider: &dyn RelationEndPointProvider,
    ) -> Result<()> {
        if source.end_point_id != self.end_point_id {
            return Err(Error::contract(format!(
                "Cannot take data of '{}' into '{}'.",
                source.end_point_id, self.end_point_id
            )));
        }
        self.current_value = source.current_value.clone();
        self.current_opposite_end_point = source
            .current_opposite_end_point
            .as_ref()
            .and_then(|id| end_point_provider.get_end_point_without_loading(id))
            .map(|end_point| end_point.id().clone());
        Ok(())
    }

    fn check_opposite_definition(&self, opposite_end_point: &RelationEndPointId) -> Result<()> {
        if opposite_end_point.definition() != &self.end_point_id.definition().opposite() {
            return Err(Error::contract(format!(
                "'{}' is not an opposite end point of '{}'.",
                opposite_end_point, self.end_point_id
            )));
        }
        Ok(())
    }
}

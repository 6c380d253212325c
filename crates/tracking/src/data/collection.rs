//! Data manager for collection end points
//!
//! Holds the ordered original and current items of one collection end
//! point. Items compare by `ObjectId`; duplicates are rejected.
//!
//! Per original item the manager knows whether the opposite real end point
//! has been registered. Items known only because the owning side was loaded
//! are tracked as "items without end point" until their end point shows up.

use crate::provider::RelationEndPointProvider;
use relata_core::{ChangeDetection, Error, ObjectId, RelationEndPointId, Result};
use rustc_hash::{FxHashMap, FxHashSet};

/// Original/current storage of a collection end point
#[derive(Debug, Clone)]
pub struct CollectionEndPointDataManager {
    end_point_id: RelationEndPointId,
    change_detection: ChangeDetection,
    original_items: Vec<ObjectId>,
    current_items: Vec<ObjectId>,
    original_opposite_end_points: FxHashSet<RelationEndPointId>,
    original_items_without_end_points: FxHashSet<ObjectId>,
    current_opposite_end_points: FxHashMap<ObjectId, RelationEndPointId>,
}

impl CollectionEndPointDataManager {
    /// Create an empty data manager for `end_point_id`
    pub fn new(end_point_id: RelationEndPointId, change_detection: ChangeDetection) -> Self {
        Self {
            end_point_id,
            change_detection,
            original_items: Vec::new(),
            current_items: Vec::new(),
            original_opposite_end_points: FxHashSet::default(),
            original_items_without_end_points: FxHashSet::default(),
            current_opposite_end_points: FxHashMap::default(),
        }
    }

    /// End point this manager stores data for
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Items including pending edits, in order
    pub fn current_items(&self) -> &[ObjectId] {
        &self.current_items
    }

    /// Items as of the last commit, in order
    pub fn original_items(&self) -> &[ObjectId] {
        &self.original_items
    }

    /// Number of current items
    pub fn len(&self) -> usize {
        self.current_items.len()
    }

    /// True if there are no current items
    pub fn is_empty(&self) -> bool {
        self.current_items.is_empty()
    }

    /// True if `item` is a current item
    pub fn contains(&self, item: &ObjectId) -> bool {
        self.current_items.contains(item)
    }

    /// Position of `item` among the current items
    pub fn index_of(&self, item: &ObjectId) -> Option<usize> {
        self.current_items.iter().position(|i| i == item)
    }

    /// True if `item` is an original item
    pub fn contains_original_item(&self, item: &ObjectId) -> bool {
        self.original_items.contains(item)
    }

    /// True if `end_point` is a registered original opposite end point
    pub fn contains_original_opposite_end_point(&self, end_point: &RelationEndPointId) -> bool {
        self.original_opposite_end_points.contains(end_point)
    }

    /// True if `item` is an original item whose end point is not registered
    pub fn contains_original_item_without_end_point(&self, item: &ObjectId) -> bool {
        self.original_items_without_end_points.contains(item)
    }

    /// Original items whose end points are not registered
    pub fn original_items_without_end_points(&self) -> impl Iterator<Item = &ObjectId> {
        self.original_items_without_end_points.iter()
    }

    /// Registered original opposite end points
    pub fn original_opposite_end_points(&self) -> impl Iterator<Item = &RelationEndPointId> {
        self.original_opposite_end_points.iter()
    }

    /// Opposite end point of a current item, if it is known
    pub fn current_opposite_end_point(&self, item: &ObjectId) -> Option<&RelationEndPointId> {
        self.current_opposite_end_points.get(item)
    }

    /// Register the real end point of an original item
    ///
    /// An item already known without end point becomes backed by
    /// `opposite_end_point`; otherwise the item is appended to the original
    /// items (and to the current items if not yet present).
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the end point is already registered.
    pub fn register_original_opposite_end_point(
        &mut self,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        self.check_opposite_definition(&opposite_end_point)?;
        if self.original_opposite_end_points.contains(&opposite_end_point) {
            return Err(Error::invalid_operation(format!(
                "The opposite end point '{}' has already been registered for '{}'.",
                opposite_end_point, self.end_point_id
            )));
        }
        let item = opposite_end_point.object_id().clone();
        if !self.original_items_without_end_points.remove(&item) {
            self.register_original_item(item.clone())?;
        }
        self.current_opposite_end_points
            .insert(item, opposite_end_point.clone());
        self.original_opposite_end_points.insert(opposite_end_point);
        Ok(())
    }

    /// Inverse of `register_original_opposite_end_point`
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the end point is not registered.
    pub fn unregister_original_opposite_end_point(
        &mut self,
        opposite_end_point: &RelationEndPointId,
    ) -> Result<()> {
        if !self.original_opposite_end_points.remove(opposite_end_point) {
            return Err(Error::invalid_operation(format!(
                "The opposite end point '{}' has not been registered for '{}'.",
                opposite_end_point, self.end_point_id
            )));
        }
        let item = opposite_end_point.object_id();
        self.current_opposite_end_points.remove(item);
        self.unregister_original_item(item);
        Ok(())
    }

    /// Record an original item whose opposite end point does not exist yet
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the item is already an original item.
    pub fn register_original_item_without_end_point(&mut self, item: ObjectId) -> Result<()> {
        self.register_original_item(item.clone())?;
        self.original_items_without_end_points.insert(item);
        Ok(())
    }

    /// Inverse of `register_original_item_without_end_point`
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the item is not registered without end point.
    pub fn unregister_original_item_without_end_point(&mut self, item: &ObjectId) -> Result<()> {
        if !self.original_items_without_end_points.remove(item) {
            return Err(Error::invalid_operation(format!(
                "The original item '{}' has not been registered without end point for '{}'.",
                item, self.end_point_id
            )));
        }
        self.unregister_original_item(item);
        Ok(())
    }

    /// Insert `item` at `index`
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the index is out of range or the
    /// item is already contained.
    pub fn insert(&mut self, index: usize, item: ObjectId) -> Result<()> {
        if index > self.current_items.len() {
            return Err(Error::contract(format!(
                "Index {} is out of range for '{}' with {} items.",
                index,
                self.end_point_id,
                self.current_items.len()
            )));
        }
        self.check_not_contained(&item)?;
        let opposite = self.opposite_id(&item)?;
        self.current_opposite_end_points.insert(item.clone(), opposite);
        self.current_items.insert(index, item);
        Ok(())
    }

    /// Remove `item`, returning its former index
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the item is not contained.
    pub fn remove(&mut self, item: &ObjectId) -> Result<usize> {
        let index = self.index_of(item).ok_or_else(|| {
            Error::contract(format!(
                "'{}' does not contain '{}'.",
                self.end_point_id, item
            ))
        })?;
        self.current_items.remove(index);
        self.current_opposite_end_points.remove(item);
        Ok(index)
    }

    /// Replace the item at `index`, returning the replaced item
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the index is out of range or the
    /// new item is contained at another position.
    pub fn replace(&mut self, index: usize, item: ObjectId) -> Result<ObjectId> {
        let old_item = self.current_items.get(index).cloned().ok_or_else(|| {
            Error::contract(format!(
                "Index {} is out of range for '{}' with {} items.",
                index,
                self.end_point_id,
                self.current_items.len()
            ))
        })?;
        if old_item == item {
            return Ok(old_item);
        }
        self.check_not_contained(&item)?;
        let opposite = self.opposite_id(&item)?;
        self.current_opposite_end_points.remove(&old_item);
        self.current_opposite_end_points.insert(item.clone(), opposite);
        self.current_items[index] = item;
        Ok(old_item)
    }

    /// Replace the whole current content
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `items` contains duplicates.
    pub fn set_items(&mut self, items: Vec<ObjectId>) -> Result<()> {
        check_unique(&self.end_point_id, &items)?;
        let mut opposites = FxHashMap::default();
        for item in &items {
            if self.original_items_without_end_points.contains(item) {
                continue;
            }
            opposites.insert(item.clone(), self.opposite_id(item)?);
        }
        self.current_opposite_end_points = opposites;
        self.current_items = items;
        Ok(())
    }

    /// Remove every current item
    pub fn clear(&mut self) {
        self.current_items.clear();
        self.current_opposite_end_points.clear();
    }

    /// True if the current items differ from the original items
    ///
    /// With `ChangeDetection::Set` only membership counts; with
    /// `ChangeDetection::Sequence` order counts as well.
    pub fn has_data_changed(&self) -> bool {
        match self.change_detection {
            ChangeDetection::Sequence => self.current_items != self.original_items,
            ChangeDetection::Set => {
                self.current_items.len() != self.original_items.len()
                    || self
                        .current_items
                        .iter()
                        .any(|item| !self.original_items.contains(item))
            }
        }
    }

    /// Make the current items the original items
    ///
    /// Items without end point stay registered as such only while they are
    /// still current items.
    pub fn commit(&mut self) {
        self.original_items = self.current_items.clone();
        let current = &self.current_items;
        self.original_items_without_end_points
            .retain(|item| current.contains(item));
        self.original_opposite_end_points =
            self.current_opposite_end_points.values().cloned().collect();
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        self.current_items = self.original_items.clone();
        self.current_opposite_end_points = self
            .original_opposite_end_points
            .iter()
            .map(|id| (id.object_id().clone(), id.clone()))
            .collect();
    }

    /// Adopt the current items of the same end point in a subordinate transaction
    ///
    /// Opposite end points are resolved in this transaction through
    /// `end_point_provider`.
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `source` manages a different end point.
    pub fn set_data_from_sub_transaction(
        &mut self,
        source: &CollectionEndPointDataManager,
        end_point_provider: &dyn RelationEndPointProvider,
    ) -> Result<()> {
        if source.end_point_id != self.end_point_id {
            return Err(Error::contract(format!(
                "Cannot take data of '{}' into '{}'.",
                source.end_point_id, self.end_point_id
            )));
        }
        self.current_items = source.current_items.clone();
        self.current_opposite_end_points = source
            .current_opposite_end_points
            .iter()
            .filter_map(|(item, id)| {
                end_point_provider
                    .get_end_point_without_loading(id)
                    .map(|end_point| (item.clone(), end_point.id().clone()))
            })
            .collect();
        Ok(())
    }

    fn register_original_item(&mut self, item: ObjectId) -> Result<()> {
        if self.original_items.contains(&item) {
            return Err(Error::invalid_operation(format!(
                "The original collection of '{}' already contains a domain object with ID '{}'.",
                self.end_point_id, item
            )));
        }
        if !self.current_items.contains(&item) {
            self.current_items.push(item.clone());
        }
        self.original_items.push(item);
        Ok(())
    }

    fn unregister_original_item(&mut self, item: &ObjectId) {
        self.original_items.retain(|i| i != item);
        self.current_items.retain(|i| i != item);
    }

    fn check_not_contained(&self, item: &ObjectId) -> Result<()> {
        if self.current_items.contains(item) {
            return Err(Error::contract(format!(
                "'{}' already contains a domain object with ID '{}'.",
                self.end_point_id, item
            )));
        }
        Ok(())
    }

    fn opposite_id(&self, item: &ObjectId) -> Result<RelationEndPointId> {
        self.end_point_id.opposite_for(item)?.ok_or_else(|| {
            Error::contract(format!(
                "'{}' has no navigable opposite end point.",
                self.end_point_id
            ))
        })
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

/// Reject duplicate ids in a list of collection items
pub(crate) fn check_unique(end_point_id: &RelationEndPointId, items: &[ObjectId]) -> Result<()> {
    let mut seen = FxHashSet::default();
    for item in items {
        if !seen.insert(item) {
            return Err(Error::contract(format!(
                "Items for '{}' contain '{}' more than once.",
                end_point_id, item
            )));
        }
    }
    Ok(())
}

//! Commands on collection end points
//!
//! Every collection command raises the relation-level notification pair plus
//! a collection-level pair describing the item change. Expansions keep the
//! items' real end points in step with the collection.

use super::{
    end_point_mut, factory, DataManagementCommand, ExpandedCommand, RelationEndPointTouchCommand,
};
use crate::end_point::check_related_class;
use crate::provider::RelationEndPointProvider;
use relata_core::{
    CollectionChange, Error, ObjectId, RelationEndPointId, Result, TransactionEventSink,
};
use std::sync::Arc;

fn check_collection(end_point_id: &RelationEndPointId) -> Result<()> {
    if !end_point_id.definition().is_collection() {
        return Err(Error::contract(format!(
            "'{}' is not a collection end point.",
            end_point_id
        )));
    }
    Ok(())
}

/// Real end point of `item` on the other side of `end_point_id`
fn item_end_point(end_point_id: &RelationEndPointId, item: &ObjectId) -> Result<RelationEndPointId> {
    RelationEndPointId::new(item.clone(), end_point_id.definition().opposite())
}

/// Remove `item` from the collection that currently holds it, unless that
/// collection is `end_point_id` itself
fn detach_from_previous_owner(
    provider: &mut dyn RelationEndPointProvider,
    end_point_id: &RelationEndPointId,
    item_end_point: &RelationEndPointId,
    item: &ObjectId,
) -> Result<Option<DataManagementCommand>> {
    let Some(previous_owner) = factory::get_related_object(provider, item_end_point)? else {
        return Ok(None);
    };
    if &previous_owner == end_point_id.object_id() {
        return Ok(None);
    }
    let previous_collection =
        RelationEndPointId::new(previous_owner, end_point_id.definition().clone())?;
    factory::create_remove_command(provider, &previous_collection, item.clone()).map(Some)
}

/// Insert an object at a position
#[derive(Debug, Clone)]
pub struct CollectionEndPointInsertCommand {
    end_point_id: RelationEndPointId,
    index: usize,
    item: ObjectId,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl CollectionEndPointInsertCommand {
    /// Create an insert command
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not a collection
    /// or the item is not of the opposite class.
    pub fn new(
        end_point_id: RelationEndPointId,
        index: usize,
        item: ObjectId,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_collection(&end_point_id)?;
        check_related_class(&end_point_id, &item)?;
        Ok(Self {
            end_point_id,
            index,
            item,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Target position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Inserted object
    pub fn item(&self) -> &ObjectId {
        &self.item
    }

    fn change(&self) -> CollectionChange {
        CollectionChange::Insert {
            index: self.index,
            item: self.item.clone(),
        }
    }

    pub(crate) fn begin(&self) {
        self.event_sink.relation_changing(
            self.end_point_id.object_id(),
            &self.end_point_id,
            None,
            Some(&self.item),
        );
        self.event_sink
            .collection_changing(&self.end_point_id, &self.change());
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        let collection = end_point_mut(provider, &self.end_point_id)?.collection_mut()?;
        collection
            .data_manager_mut()?
            .insert(self.index, self.item.clone())?;
        collection.touch();
        Ok(())
    }

    pub(crate) fn end(&self) {
        self.event_sink
            .collection_changed(&self.end_point_id, &self.change());
        self.event_sink.relation_changed(
            self.end_point_id.object_id(),
            &self.end_point_id,
            None,
            Some(&self.item),
        );
    }

    // item <- owner, this, previous collection of item -> remove item
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let item_end_point = item_end_point(&self.end_point_id, &self.item)?;
        let detach =
            detach_from_previous_owner(provider, &self.end_point_id, &item_end_point, &self.item)?;

        let mut expanded = ExpandedCommand::new();
        expanded.push(factory::create_set_command(
            provider,
            &item_end_point,
            Some(self.end_point_id.object_id().clone()),
        )?);
        expanded.push(DataManagementCommand::CollectionInsert(self));
        if let Some(detach) = detach {
            expanded.push(detach);
        }
        Ok(expanded)
    }
}

/// Remove an object
///
/// Removal goes by item. The index reported in notifications is the item's
/// position when the command was created; an earlier command of the same
/// expansion removing from the same collection does not shift it.
#[derive(Debug, Clone)]
pub struct CollectionEndPointRemoveCommand {
    end_point_id: RelationEndPointId,
    index: usize,
    item: ObjectId,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl CollectionEndPointRemoveCommand {
    /// Create a remove command for the item currently at `index`
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not a collection.
    pub fn new(
        end_point_id: RelationEndPointId,
        index: usize,
        item: ObjectId,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_collection(&end_point_id)?;
        Ok(Self {
            end_point_id,
            index,
            item,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Position of the removed object when the command was created
    pub fn index(&self) -> usize {
        self.index
    }

    /// Removed object
    pub fn item(&self) -> &ObjectId {
        &self.item
    }

    fn change(&self) -> CollectionChange {
        CollectionChange::Remove {
            index: self.index,
            item: self.item.clone(),
        }
    }

    pub(crate) fn begin(&self) {
        self.event_sink.relation_changing(
            self.end_point_id.object_id(),
            &self.end_point_id,
            Some(&self.item),
            None,
        );
        self.event_sink
            .collection_changing(&self.end_point_id, &self.change());
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        let collection = end_point_mut(provider, &self.end_point_id)?.collection_mut()?;
        collection.data_manager_mut()?.remove(&self.item)?;
        collection.touch();
        Ok(())
    }

    pub(crate) fn end(&self) {
        self.event_sink
            .collection_changed(&self.end_point_id, &self.change());
        self.event_sink.relation_changed(
            self.end_point_id.object_id(),
            &self.end_point_id,
            Some(&self.item),
            None,
        );
    }

    // this, item -> null
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let item_end_point = item_end_point(&self.end_point_id, &self.item)?;
        let mut expanded = ExpandedCommand::from(DataManagementCommand::CollectionRemove(self));
        expanded.push(factory::create_set_command(provider, &item_end_point, None)?);
        Ok(expanded)
    }
}

/// Replace the object at a position with another object
#[derive(Debug, Clone)]
pub struct CollectionEndPointReplaceCommand {
    end_point_id: RelationEndPointId,
    index: usize,
    old_item: ObjectId,
    new_item: ObjectId,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl CollectionEndPointReplaceCommand {
    /// Create a replace command
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not a collection,
    /// the items are equal, or the new item is not of the opposite class.
    pub fn new(
        end_point_id: RelationEndPointId,
        index: usize,
        old_item: ObjectId,
        new_item: ObjectId,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_collection(&end_point_id)?;
        if old_item == new_item {
            return Err(Error::contract(format!(
                "Replacing '{}' with itself in '{}' requires a same-value command.",
                old_item, end_point_id
            )));
        }
        check_related_class(&end_point_id, &new_item)?;
        Ok(Self {
            end_point_id,
            index,
            old_item,
            new_item,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Position of the replaced object
    pub fn index(&self) -> usize {
        self.index
    }

    /// Object leaving the collection
    pub fn old_item(&self) -> &ObjectId {
        &self.old_item
    }

    /// Object entering the collection
    pub fn new_item(&self) -> &ObjectId {
        &self.new_item
    }

    fn change(&self) -> CollectionChange {
        CollectionChange::Replace {
            index: self.index,
            old_item: self.old_item.clone(),
            new_item: self.new_item.clone(),
        }
    }

    pub(crate) fn begin(&self) {
        self.event_sink.relation_changing(
            self.end_point_id.object_id(),
            &self.end_point_id,
            Some(&self.old_item),
            Some(&self.new_item),
        );
        self.event_sink
            .collection_changing(&self.end_point_id, &self.change());
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        let collection = end_point_mut(provider, &self.end_point_id)?.collection_mut()?;
        collection
            .data_manager_mut()?
            .replace(self.index, self.new_item.clone())?;
        collection.touch();
        Ok(())
    }

    pub(crate) fn end(&self) {
        self.event_sink
            .collection_changed(&self.end_point_id, &self.change());
        self.event_sink.relation_changed(
            self.end_point_id.object_id(),
            &self.end_point_id,
            Some(&self.old_item),
            Some(&self.new_item),
        );
    }

    // new item <- owner, this, old item -> null, previous collection of new item -> remove
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let new_item_end_point = item_end_point(&self.end_point_id, &self.new_item)?;
        let old_item_end_point = item_end_point(&self.end_point_id, &self.old_item)?;
        let detach = detach_from_previous_owner(
            provider,
            &self.end_point_id,
            &new_item_end_point,
            &self.new_item,
        )?;

        let mut expanded = ExpandedCommand::new();
        expanded.push(factory::create_set_command(
            provider,
            &new_item_end_point,
            Some(self.end_point_id.object_id().clone()),
        )?);
        expanded.push(DataManagementCommand::CollectionReplace(self));
        expanded.push(factory::create_set_command(provider, &old_item_end_point, None)?);
        if let Some(detach) = detach {
            expanded.push(detach);
        }
        Ok(expanded)
    }
}

/// Replace an object with itself
///
/// Raises no notifications; performing it only touches the end point.
#[derive(Debug, Clone)]
pub struct CollectionEndPointReplaceSameCommand {
    end_point_id: RelationEndPointId,
    index: usize,
    item: ObjectId,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl CollectionEndPointReplaceSameCommand {
    /// Create a same-value replace command
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not a collection.
    pub fn new(
        end_point_id: RelationEndPointId,
        index: usize,
        item: ObjectId,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_collection(&end_point_id)?;
        Ok(Self {
            end_point_id,
            index,
            item,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Position of the item
    pub fn index(&self) -> usize {
        self.index
    }

    /// The unchanged item
    pub fn item(&self) -> &ObjectId {
        &self.item
    }

    /// Sink the command was created with
    pub fn event_sink(&self) -> &Arc<dyn TransactionEventSink> {
        &self.event_sink
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        end_point_mut(provider, &self.end_point_id)?.touch();
        Ok(())
    }

    // this, touch of the item's real end point
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let item_end_point = item_end_point(&self.end_point_id, &self.item)?;
        let mut expanded =
            ExpandedCommand::from(DataManagementCommand::CollectionReplaceSame(self));
        if provider.get_end_point_without_loading(&item_end_point).is_some() {
            expanded.push(DataManagementCommand::Touch(RelationEndPointTouchCommand::new(
                item_end_point,
            )));
        }
        Ok(expanded)
    }
}

/// Replace the whole content of a collection
#[derive(Debug, Clone)]
pub struct CollectionEndPointSetCollectionCommand {
    end_point_id: RelationEndPointId,
    new_items: Vec<ObjectId>,
    removed: Vec<ObjectId>,
    added: Vec<ObjectId>,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl CollectionEndPointSetCollectionCommand {
    /// Create a set-collection command from the current and the new items
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not a collection
    /// or a new item is not of the opposite class.
    pub fn new(
        end_point_id: RelationEndPointId,
        current_items: &[ObjectId],
        new_items: Vec<ObjectId>,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_collection(&end_point_id)?;
        for item in &new_items {
            check_related_class(&end_point_id, item)?;
        }
        let removed = current_items
            .iter()
            .filter(|item| !new_items.contains(item))
            .cloned()
            .collect();
        let added = new_items
            .iter()
            .filter(|item| !current_items.contains(item))
            .cloned()
            .collect();
        Ok(Self {
            end_point_id,
            new_items,
            removed,
            added,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Content after the command
    pub fn new_items(&self) -> &[ObjectId] {
        &self.new_items
    }

    /// Objects leaving the collection, in their current order
    pub fn removed_items(&self) -> &[ObjectId] {
        &self.removed
    }

    /// Objects entering the collection, in their new order
    pub fn added_items(&self) -> &[ObjectId] {
        &self.added
    }

    fn change(&self) -> CollectionChange {
        CollectionChange::SetItems {
            removed: self.removed.clone(),
            added: self.added.clone(),
        }
    }

    pub(crate) fn begin(&self) {
        let owner = self.end_point_id.object_id();
        for removed in &self.removed {
            self.event_sink
                .relation_changing(owner, &self.end_point_id, Some(removed), None);
        }
        for added in &self.added {
            self.event_sink
                .relation_changing(owner, &self.end_point_id, None, Some(added));
        }
        self.event_sink
            .collection_changing(&self.end_point_id, &self.change());
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        let collection = end_point_mut(provider, &self.end_point_id)?.collection_mut()?;
        collection
            .data_manager_mut()?
            .set_items(self.new_items.clone())?;
        collection.touch();
        Ok(())
    }

    pub(crate) fn end(&self) {
        let owner = self.end_point_id.object_id();
        self.event_sink
            .collection_changed(&self.end_point_id, &self.change());
        for added in self.added.iter().rev() {
            self.event_sink
                .relation_changed(owner, &self.end_point_id, None, Some(added));
        }
        for removed in self.removed.iter().rev() {
            self.event_sink
                .relation_changed(owner, &self.end_point_id, Some(removed), None);
        }
    }

    // removed items -> null, added items <- owner (and leave their previous collection), this
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let owner = self.end_point_id.object_id().clone();
        let mut expanded = ExpandedCommand::new();

        for removed in &self.removed {
            let removed_end_point = item_end_point(&self.end_point_id, removed)?;
            expanded.push(factory::create_set_command(provider, &removed_end_point, None)?);
        }
        for added in &self.added {
            let added_end_point = item_end_point(&self.end_point_id, added)?;
            let detach =
                detach_from_previous_owner(provider, &self.end_point_id, &added_end_point, added)?;
            expanded.push(factory::create_set_command(
                provider,
                &added_end_point,
                Some(owner.clone()),
            )?);
            if let Some(detach) = detach {
                expanded.push(detach);
            }
        }
        expanded.push(DataManagementCommand::CollectionSetCollection(self));
        Ok(expanded)
    }
}

/// Clear a collection because its owner is deleted
///
/// Raises no notifications; the owner's deletion is announced elsewhere.
#[derive(Debug, Clone)]
pub struct CollectionEndPointDeleteCommand {
    end_point_id: RelationEndPointId,
    items: Vec<ObjectId>,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl CollectionEndPointDeleteCommand {
    /// Create a delete command clearing `items`
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not a collection.
    pub fn new(
        end_point_id: RelationEndPointId,
        items: Vec<ObjectId>,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_collection(&end_point_id)?;
        Ok(Self {
            end_point_id,
            items,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Items held when the command was created
    pub fn items(&self) -> &[ObjectId] {
        &self.items
    }

    /// Sink the command was created with
    pub fn event_sink(&self) -> &Arc<dyn TransactionEventSink> {
        &self.event_sink
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        let collection = end_point_mut(provider, &self.end_point_id)?.collection_mut()?;
        collection.data_manager_mut()?.clear();
        collection.touch();
        Ok(())
    }

    // this, every item -> null
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let item_end_points = self
            .items
            .iter()
            .map(|item| item_end_point(&self.end_point_id, item))
            .collect::<Result<Vec<_>>>()?;
        let mut expanded = ExpandedCommand::from(DataManagementCommand::CollectionDelete(self));
        for item_end_point in item_end_points {
            expanded.push(factory::create_set_command(provider, &item_end_point, None)?);
        }
        Ok(expanded)
    }
}

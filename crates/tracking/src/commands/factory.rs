//! Command creation by end-point id
//!
//! Expansions and the manager create every command through these functions,
//! so the same completeness and synchronization guards apply no matter
//! which side of a relation initiated a change.

use super::DataManagementCommand;
use crate::end_point::RelationEndPoint;
use crate::provider::RelationEndPointProvider;
use crate::sync;
use relata_core::{Error, ObjectId, RelationEndPointId, Result};

/// Command setting the scalar end point `id` to `new_value`
///
/// # Errors
/// Returns `Error::ContractViolation` for a collection end point,
/// `Error::OutOfSync` if either side is out of sync, and propagates load
/// failures.
pub fn create_set_command(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
    new_value: Option<ObjectId>,
) -> Result<DataManagementCommand> {
    if id.definition().is_real_object() {
        let synchronized = sync::is_synchronized(provider, id)?;
        return registered(provider, id)?
            .real_object()?
            .create_set_command(new_value, synchronized);
    }
    provider
        .get_end_point_with_lazy_load(id)?
        .virtual_object_mut()?
        .create_set_command(new_value)
}

/// Command clearing the end point `id` because its owner is deleted
pub fn create_delete_command(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
) -> Result<DataManagementCommand> {
    if id.definition().is_real_object() {
        let synchronized = sync::is_synchronized(provider, id)?;
        return registered(provider, id)?
            .real_object()?
            .create_delete_command(synchronized);
    }
    match provider.get_end_point_with_lazy_load(id)? {
        RelationEndPoint::VirtualObject(end_point) => end_point.create_delete_command(),
        RelationEndPoint::Collection(end_point) => end_point.create_delete_command(),
        RelationEndPoint::RealObject(end_point) => end_point.create_delete_command(true),
    }
}

/// Command inserting `item` at `index` into the collection `id`
pub fn create_insert_command(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
    index: usize,
    item: ObjectId,
) -> Result<DataManagementCommand> {
    provider
        .get_end_point_with_lazy_load(id)?
        .collection_mut()?
        .create_insert_command(index, item)
}

/// Command appending `item` to the collection `id`
pub fn create_add_command(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
    item: ObjectId,
) -> Result<DataManagementCommand> {
    provider
        .get_end_point_with_lazy_load(id)?
        .collection_mut()?
        .create_add_command(item)
}

/// Command removing `item` from the collection `id`
pub fn create_remove_command(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
    item: ObjectId,
) -> Result<DataManagementCommand> {
    provider
        .get_end_point_with_lazy_load(id)?
        .collection_mut()?
        .create_remove_command(item)
}

/// Command replacing the item at `index` of the collection `id`
pub fn create_replace_command(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
    index: usize,
    item: ObjectId,
) -> Result<DataManagementCommand> {
    provider
        .get_end_point_with_lazy_load(id)?
        .collection_mut()?
        .create_replace_command(index, item)
}

/// Command replacing the whole content of the collection `id`
pub fn create_set_collection_command(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
    items: Vec<ObjectId>,
) -> Result<DataManagementCommand> {
    provider
        .get_end_point_with_lazy_load(id)?
        .collection_mut()?
        .create_set_collection_command(items)
}

/// Current related object of the scalar end point `id`, loading if needed
///
/// # Errors
/// Returns `Error::ContractViolation` for a collection end point.
pub fn get_related_object(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
) -> Result<Option<ObjectId>> {
    match provider.get_end_point_with_lazy_load(id)? {
        RelationEndPoint::RealObject(end_point) => Ok(end_point.get_data().cloned()),
        RelationEndPoint::VirtualObject(end_point) => Ok(end_point.get_data()?.cloned()),
        RelationEndPoint::Collection(end_point) => Err(Error::contract(format!(
            "'{}' is a collection end point and has no single related object.",
            end_point.id()
        ))),
    }
}

fn registered<'a>(
    provider: &'a dyn RelationEndPointProvider,
    id: &RelationEndPointId,
) -> Result<&'a RelationEndPoint> {
    provider
        .get_end_point_without_loading(id)
        .ok_or_else(|| Error::EndPointNotFound(id.clone()))
}

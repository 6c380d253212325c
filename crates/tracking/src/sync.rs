//! Bidirectional relation synchronization service
//!
//! Two sides of a relation can disagree when the real side was loaded with
//! a foreign key the virtual side's loaded data does not mention, or when the
//! virtual side's data mentions an object whose real end point is not
//! loaded. Such end points refuse most commands with `Error::OutOfSync`
//! until they are synchronized explicitly here.

use crate::end_point::RelationEndPoint;
use crate::provider::RelationEndPointProvider;
use relata_core::{Error, RelationEndPointId, Result};
use tracing::debug;

/// Whether the end point `id` agrees with its opposite side
///
/// Loads the virtual end point involved when its data is not known yet:
/// the end point itself if it is virtual, otherwise the opposite end point of
/// its original value.
///
/// # Errors
/// Returns `Error::EndPointNotFound` for an unregistered real end point and
/// propagates load failures.
pub fn is_synchronized(
    provider: &mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
) -> Result<bool> {
    if id.definition().is_virtual() {
        provider.get_end_point_with_lazy_load(id)?;
        return known_state(provider, id)?
            .ok_or_else(|| Error::invalid_operation(format!("The data of '{}' could not be loaded.", id)));
    }

    if let Some(state) = known_state(provider, id)? {
        return Ok(state);
    }
    let opposite = original_opposite_end_point(provider, id)?;
    debug!(target: "relata::sync", end_point = %id, opposite = %opposite, "Loading opposite end point to check synchronization");
    provider.get_end_point_with_lazy_load(&opposite)?;
    known_state(provider, id)?.ok_or_else(|| {
        Error::invalid_operation(format!(
            "The synchronization state of '{}' cannot be determined.",
            id
        ))
    })
}

/// Bring the end point `id` in line with its opposite side
///
/// A real end point is registered as the backing of its original value on
/// the opposite virtual end point. A virtual end point drops the original
/// items whose real end points are missing.
///
/// # Errors
/// Returns `Error::InvalidOperation` if the opposite end point already
/// refers to another object.
pub fn synchronize(provider: &mut dyn RelationEndPointProvider, id: &RelationEndPointId) -> Result<()> {
    if id.definition().is_virtual() {
        debug!(target: "relata::sync", end_point = %id, "Synchronizing virtual end point");
        return match provider.get_end_point_with_lazy_load(id)? {
            RelationEndPoint::VirtualObject(end_point) => end_point.synchronize(),
            RelationEndPoint::Collection(end_point) => end_point.synchronize(),
            RelationEndPoint::RealObject(_) => Ok(()),
        };
    }

    if is_synchronized(provider, id)? {
        return Ok(());
    }
    let opposite = original_opposite_end_point(provider, id)?;
    debug!(target: "relata::sync", end_point = %id, opposite = %opposite, "Synchronizing real end point");
    provider
        .get_end_point_with_lazy_load(&opposite)?
        .synchronize_opposite_end_point(id.clone())
}

fn known_state(
    provider: &dyn RelationEndPointProvider,
    id: &RelationEndPointId,
) -> Result<Option<bool>> {
    let end_point = provider
        .get_end_point_without_loading(id)
        .ok_or_else(|| Error::EndPointNotFound(id.clone()))?;
    Ok(end_point.is_synchronized(provider))
}

fn original_opposite_end_point(
    provider: &dyn RelationEndPointProvider,
    id: &RelationEndPointId,
) -> Result<RelationEndPointId> {
    let end_point = provider
        .get_end_point_without_loading(id)
        .ok_or_else(|| Error::EndPointNotFound(id.clone()))?;
    end_point
        .real_object()?
        .original_opposite_end_point_id()
        .ok_or_else(|| {
            Error::invalid_operation(format!("'{}' has no opposite end point.", id))
        })
}

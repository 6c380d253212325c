//! Relation end points
//!
//! One end point exists per (object, relation side). Real end points hold
//! the foreign key and are always complete; virtual object and collection
//! end points own a load state and derive their data from the opposite real
//! end points.

pub mod collection;
pub mod real;
pub mod virtual_object;

pub use collection::CollectionEndPoint;
pub use real::RealObjectEndPoint;
pub use virtual_object::VirtualObjectEndPoint;

use crate::provider::RelationEndPointProvider;
use relata_core::{
    Error, ObjectId, RelationEndPointDefinition, RelationEndPointId, Result,
    TransactionEventSink,
};
use std::sync::Arc;

/// One side of a relation for one object
#[derive(Debug, Clone)]
pub enum RelationEndPoint {
    /// Scalar side holding the foreign key
    RealObject(RealObjectEndPoint),
    /// Scalar side derived from the opposite real end point
    VirtualObject(VirtualObjectEndPoint),
    /// Ordered "many" side derived from the opposite real end points
    Collection(CollectionEndPoint),
}

impl RelationEndPoint {
    /// Id of this end point
    pub fn id(&self) -> &RelationEndPointId {
        match self {
            RelationEndPoint::RealObject(e) => e.id(),
            RelationEndPoint::VirtualObject(e) => e.id(),
            RelationEndPoint::Collection(e) => e.id(),
        }
    }

    /// Owning object
    pub fn object_id(&self) -> &ObjectId {
        self.id().object_id()
    }

    /// Relation side
    pub fn definition(&self) -> &RelationEndPointDefinition {
        self.id().definition()
    }

    /// Sink receiving this end point's notifications
    pub fn event_sink(&self) -> &Arc<dyn TransactionEventSink> {
        match self {
            RelationEndPoint::RealObject(e) => e.event_sink(),
            RelationEndPoint::VirtualObject(e) => e.event_sink(),
            RelationEndPoint::Collection(e) => e.event_sink(),
        }
    }

    /// True for virtual object and collection end points
    pub fn is_virtual(&self) -> bool {
        !matches!(self, RelationEndPoint::RealObject(_))
    }

    /// True once the data is known; real end points are always complete
    pub fn is_data_complete(&self) -> bool {
        match self {
            RelationEndPoint::RealObject(_) => true,
            RelationEndPoint::VirtualObject(e) => e.is_data_complete(),
            RelationEndPoint::Collection(e) => e.is_data_complete(),
        }
    }

    /// Load the data unless it is known
    pub fn ensure_data_complete(&mut self) -> Result<()> {
        match self {
            RelationEndPoint::RealObject(_) => Ok(()),
            RelationEndPoint::VirtualObject(e) => e.ensure_data_complete(),
            RelationEndPoint::Collection(e) => e.ensure_data_complete(),
        }
    }

    /// Mark the end point as accessed
    pub fn touch(&mut self) {
        match self {
            RelationEndPoint::RealObject(e) => e.touch(),
            RelationEndPoint::VirtualObject(e) => e.touch(),
            RelationEndPoint::Collection(e) => e.touch(),
        }
    }

    /// True if touched since the last commit or rollback
    pub fn has_been_touched(&self) -> bool {
        match self {
            RelationEndPoint::RealObject(e) => e.has_been_touched(),
            RelationEndPoint::VirtualObject(e) => e.has_been_touched(),
            RelationEndPoint::Collection(e) => e.has_been_touched(),
        }
    }

    /// True if the data changed since the last commit; incomplete end
    /// points never report a change
    pub fn has_changed(&self) -> bool {
        match self {
            RelationEndPoint::RealObject(e) => e.has_changed(),
            RelationEndPoint::VirtualObject(e) => e.has_changed(),
            RelationEndPoint::Collection(e) => e.has_changed(),
        }
    }

    /// Make the current data the original data
    pub fn commit(&mut self) {
        match self {
            RelationEndPoint::RealObject(e) => e.commit(),
            RelationEndPoint::VirtualObject(e) => e.commit(),
            RelationEndPoint::Collection(e) => e.commit(),
        }
    }

    /// Discard pending edits
    pub fn rollback(&mut self) {
        match self {
            RelationEndPoint::RealObject(e) => e.rollback(),
            RelationEndPoint::VirtualObject(e) => e.rollback(),
            RelationEndPoint::Collection(e) => e.rollback(),
        }
    }

    /// Whether both sides of the relation agree on this end point's data
    ///
    /// `None` when that cannot be told without loading: for a virtual end
    /// point while it is incomplete, for a real end point while its opposite
    /// end point is missing or incomplete.
    pub fn is_synchronized(&self, provider: &dyn RelationEndPointProvider) -> Option<bool> {
        match self {
            RelationEndPoint::RealObject(e) => e.is_synchronized(provider),
            RelationEndPoint::VirtualObject(e) => e.is_synchronized(),
            RelationEndPoint::Collection(e) => e.is_synchronized(),
        }
    }

    /// Whether `opposite_end_point` is registered here as unsynchronized
    ///
    /// `None` while this end point's data is not known.
    pub(crate) fn is_unsynchronized_opposite(
        &self,
        opposite_end_point: &RelationEndPointId,
    ) -> Option<bool> {
        match self {
            RelationEndPoint::RealObject(_) => Some(false),
            RelationEndPoint::VirtualObject(e) => e
                .complete_state()
                .map(|complete| complete.is_unsynchronized_opposite(opposite_end_point)),
            RelationEndPoint::Collection(e) => e
                .complete_state()
                .map(|complete| complete.is_unsynchronized_opposite(opposite_end_point)),
        }
    }

    /// Register a real end point whose original value is this end point's owner
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` on a real end point.
    pub fn register_original_opposite_end_point(
        &mut self,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        match self {
            RelationEndPoint::RealObject(e) => Err(not_virtual(e.id())),
            RelationEndPoint::VirtualObject(e) => {
                e.register_original_opposite_end_point(opposite_end_point)
            }
            RelationEndPoint::Collection(e) => {
                e.register_original_opposite_end_point(opposite_end_point)
            }
        }
    }

    /// Inverse of `register_original_opposite_end_point`
    pub fn unregister_original_opposite_end_point(
        &mut self,
        opposite_end_point: &RelationEndPointId,
    ) -> Result<()> {
        match self {
            RelationEndPoint::RealObject(e) => Err(not_virtual(e.id())),
            RelationEndPoint::VirtualObject(e) => {
                e.unregister_original_opposite_end_point(opposite_end_point)
            }
            RelationEndPoint::Collection(e) => {
                e.unregister_original_opposite_end_point(opposite_end_point)
            }
        }
    }

    /// Register a real end point as agreeing with this end point
    pub fn synchronize_opposite_end_point(
        &mut self,
        opposite_end_point: RelationEndPointId,
    ) -> Result<()> {
        match self {
            RelationEndPoint::RealObject(e) => Err(not_virtual(e.id())),
            RelationEndPoint::VirtualObject(e) => {
                e.synchronize_opposite_end_point(opposite_end_point)
            }
            RelationEndPoint::Collection(e) => e.synchronize_opposite_end_point(opposite_end_point),
        }
    }

    /// Adopt the data of the same end point in a subordinate transaction
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if `source` is of another kind or
    /// addresses another end point.
    pub fn set_data_from_sub_transaction(
        &mut self,
        source: &RelationEndPoint,
        end_point_provider: &dyn RelationEndPointProvider,
    ) -> Result<()> {
        if source.id() != self.id() {
            return Err(Error::contract(format!(
                "Cannot take data of '{}' into '{}'.",
                source.id(),
                self.id()
            )));
        }
        match (self, source) {
            (RelationEndPoint::RealObject(target), RelationEndPoint::RealObject(source)) => {
                target.set_data_from_sub_transaction(source)
            }
            (RelationEndPoint::VirtualObject(target), RelationEndPoint::VirtualObject(source)) => {
                target.set_data_from_sub_transaction(source, end_point_provider)
            }
            (RelationEndPoint::Collection(target), RelationEndPoint::Collection(source)) => {
                target.set_data_from_sub_transaction(source, end_point_provider)
            }
            (target, _) => Err(Error::contract(format!(
                "The end point '{}' of the subordinate transaction is of a different kind.",
                target.id()
            ))),
        }
    }

    /// The real end point, if this is one
    pub fn as_real_object(&self) -> Option<&RealObjectEndPoint> {
        match self {
            RelationEndPoint::RealObject(e) => Some(e),
            _ => None,
        }
    }

    /// The virtual object end point, if this is one
    pub fn as_virtual_object(&self) -> Option<&VirtualObjectEndPoint> {
        match self {
            RelationEndPoint::VirtualObject(e) => Some(e),
            _ => None,
        }
    }

    /// The collection end point, if this is one
    pub fn as_collection(&self) -> Option<&CollectionEndPoint> {
        match self {
            RelationEndPoint::Collection(e) => Some(e),
            _ => None,
        }
    }

    /// The real end point, or a contract violation
    pub fn real_object(&self) -> Result<&RealObjectEndPoint> {
        self.as_real_object()
            .ok_or_else(|| wrong_kind(self.id(), "real object"))
    }

    /// Mutable access to the real end point, or a contract violation
    pub fn real_object_mut(&mut self) -> Result<&mut RealObjectEndPoint> {
        match self {
            RelationEndPoint::RealObject(e) => Ok(e),
            other => Err(wrong_kind(other.id(), "real object")),
        }
    }

    /// Mutable access to the virtual object end point, or a contract violation
    pub fn virtual_object_mut(&mut self) -> Result<&mut VirtualObjectEndPoint> {
        match self {
            RelationEndPoint::VirtualObject(e) => Ok(e),
            other => Err(wrong_kind(other.id(), "virtual object")),
        }
    }

    /// Mutable access to the collection end point, or a contract violation
    pub fn collection_mut(&mut self) -> Result<&mut CollectionEndPoint> {
        match self {
            RelationEndPoint::Collection(e) => Ok(e),
            other => Err(wrong_kind(other.id(), "collection")),
        }
    }
}

/// Reject a related object of the wrong class
pub(crate) fn check_related_class(id: &RelationEndPointId, related: &ObjectId) -> Result<()> {
    let expected = id.definition().opposite();
    if related.class_id() != expected.class_id() {
        return Err(Error::contract(format!(
            "'{}' cannot refer to '{}': expected an object of class '{}'.",
            id,
            related,
            expected.class_id()
        )));
    }
    Ok(())
}

fn not_virtual(id: &RelationEndPointId) -> Error {
    Error::contract(format!(
        "'{}' is a real end point and has no opposite end point registrations.",
        id
    ))
}

fn wrong_kind(id: &RelationEndPointId, expected: &str) -> Error {
    Error::contract(format!("'{}' is not a {} end point.", id, expected))
}

//! End-point lookup
//!
//! Commands address end points by `RelationEndPointId` and reach them
//! through a provider at perform time. `RelationEndPointManager` is the
//! production implementation.

use crate::end_point::RelationEndPoint;
use relata_core::{RelationEndPointId, Result};

/// Access to the end points of one transaction
pub trait RelationEndPointProvider {
    /// Registered end point, never triggering a load or creating one
    fn get_end_point_without_loading(&self, id: &RelationEndPointId) -> Option<&RelationEndPoint>;

    /// Registered end point for mutation, never triggering a load
    fn get_end_point_mut(&mut self, id: &RelationEndPointId) -> Option<&mut RelationEndPoint>;

    /// End point with complete data
    ///
    /// A missing virtual end point is created and its data loaded. A missing
    /// real end point cannot be materialized and yields
    /// `Error::EndPointNotFound`.
    fn get_end_point_with_lazy_load(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<&mut RelationEndPoint>;
}

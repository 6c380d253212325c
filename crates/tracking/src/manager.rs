//! Relation end-point manager
//!
//! The manager is the arena of one transaction's end points, keyed by
//! `RelationEndPointId`, and the production `RelationEndPointProvider`.
//! It registers the end points of loaded and new objects, materializes
//! virtual end points on demand, executes commands with their expansions
//! and commits or rolls back all end points at once.
//!
//! # Example
//!
//! ```ignore
//! let mut manager = RelationEndPointManager::new(config, loader, sink);
//! manager.register_real_object_end_point(order_customer, Some(customer))?;
//! manager.set_related_object(&order_customer, Some(other_customer))?;
//! manager.commit_all_end_points();
//! ```

use crate::commands::{factory, DataManagementCommand, ExpandedCommand};
use crate::data::{DefaultDataManagerFactory, EndPointDataManagerFactory};
use crate::end_point::{
    CollectionEndPoint, RealObjectEndPoint, RelationEndPoint, VirtualObjectEndPoint,
};
use crate::load_state::{EndPointLoader, LoadedEndPointData};
use crate::provider::RelationEndPointProvider;
use crate::sync;
use relata_core::{
    Error, ObjectId, RelationEndPointDefinition, RelationEndPointId, Result, TrackingConfig,
    TransactionEventSink,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Arena of the end points of one transaction
#[derive(Debug)]
pub struct RelationEndPointManager {
    config: TrackingConfig,
    loader: Arc<dyn EndPointLoader>,
    data_manager_factory: Arc<dyn EndPointDataManagerFactory>,
    event_sink: Arc<dyn TransactionEventSink>,
    end_points: FxHashMap<RelationEndPointId, RelationEndPoint>,
}

impl RelationEndPointManager {
    /// Create an empty manager
    ///
    /// Data managers are created by a `DefaultDataManagerFactory` using the
    /// configured change detection.
    pub fn new(
        config: TrackingConfig,
        loader: Arc<dyn EndPointLoader>,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Self {
        let data_manager_factory = Arc::new(DefaultDataManagerFactory::new(config.change_detection));
        Self {
            config,
            loader,
            data_manager_factory,
            event_sink,
            end_points: FxHashMap::default(),
        }
    }

    /// Replace the data manager factory
    pub fn with_data_manager_factory(
        mut self,
        data_manager_factory: Arc<dyn EndPointDataManagerFactory>,
    ) -> Self {
        self.data_manager_factory = data_manager_factory;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Sink injected into every end point
    pub fn event_sink(&self) -> &Arc<dyn TransactionEventSink> {
        &self.event_sink
    }

    /// Number of registered end points
    pub fn len(&self) -> usize {
        self.end_points.len()
    }

    /// True if no end point is registered
    pub fn is_empty(&self) -> bool {
        self.end_points.is_empty()
    }

    /// True if `id` is registered
    pub fn contains(&self, id: &RelationEndPointId) -> bool {
        self.end_points.contains_key(id)
    }

    /// All registered end points, in no particular order
    pub fn end_points(&self) -> impl Iterator<Item = &RelationEndPoint> {
        self.end_points.values()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register the real end point of a loaded object
    ///
    /// The end point is registered with the opposite virtual end point of
    /// `original_value`, which is created incomplete if necessary.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the end point is already
    /// registered, `Error::ContractViolation` if `id` is not a real end point.
    pub fn register_real_object_end_point(
        &mut self,
        id: RelationEndPointId,
        original_value: Option<ObjectId>,
    ) -> Result<()> {
        self.check_not_registered(&id)?;
        let end_point = RealObjectEndPoint::new(id.clone(), original_value, Arc::clone(&self.event_sink))?;
        if let Some(opposite) = end_point.original_opposite_end_point_id() {
            self.get_or_create_virtual_end_point(&opposite)?
                .register_original_opposite_end_point(id.clone())?;
        }
        debug!(
            target: "relata::manager",
            end_point = %id,
            value = %relata_core::display_related(end_point.get_data()),
            "Registered real end point"
        );
        self.end_points
            .insert(id, RelationEndPoint::RealObject(end_point));
        Ok(())
    }

    /// Remove the real end point of an object leaving the transaction
    ///
    /// # Errors
    /// Returns `Error::EndPointNotFound` if it is not registered and
    /// `Error::InvalidOperation` if it has uncommitted changes.
    pub fn unregister_real_object_end_point(&mut self, id: &RelationEndPointId) -> Result<()> {
        let end_point = self
            .end_points
            .get(id)
            .ok_or_else(|| Error::EndPointNotFound(id.clone()))?
            .real_object()?;
        if end_point.has_changed() {
            return Err(Error::invalid_operation(format!(
                "The end point '{}' has changed and cannot be unregistered.",
                id
            )));
        }
        if let Some(opposite) = end_point.original_opposite_end_point_id() {
            if let Some(opposite_end_point) = self.end_points.get_mut(&opposite) {
                opposite_end_point.unregister_original_opposite_end_point(id)?;
            }
        }
        self.end_points.remove(id);
        debug!(target: "relata::manager", end_point = %id, "Unregistered real end point");
        Ok(())
    }

    /// Register complete, empty end points for a newly created object
    ///
    /// Anonymous definitions are skipped.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if one of the end points is already
    /// registered; nothing is registered in that case.
    pub fn register_end_points_for_new_object(
        &mut self,
        object_id: &ObjectId,
        definitions: &[RelationEndPointDefinition],
    ) -> Result<()> {
        let mut created = Vec::with_capacity(definitions.len());
        for definition in definitions.iter().filter(|d| !d.is_anonymous()) {
            let id = RelationEndPointId::new(object_id.clone(), definition.clone())?;
            self.check_not_registered(&id)?;
            created.push((id.clone(), self.create_new_end_point(id)?));
        }
        debug!(
            target: "relata::manager",
            object = %object_id,
            end_points = created.len(),
            "Registered end points of new object"
        );
        self.end_points.extend(created);
        Ok(())
    }

    /// The virtual end point `id`, created incomplete if missing
    ///
    /// # Errors
    /// Returns `Error::EndPointNotFound` for a missing real end point.
    pub fn get_or_create_virtual_end_point(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<&mut RelationEndPoint> {
        if !self.end_points.contains_key(id) {
            let end_point = self.create_incomplete_end_point(id)?;
            debug!(target: "relata::manager", end_point = %id, "Created incomplete virtual end point");
            self.end_points.insert(id.clone(), end_point);
        }
        self.end_points
            .get_mut(id)
            .ok_or_else(|| Error::EndPointNotFound(id.clone()))
    }

    /// Complete the virtual end point `id` with data fetched by the caller
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the data is already complete,
    /// `Error::ContractViolation` if `data` does not fit the end point.
    pub fn mark_data_complete(
        &mut self,
        id: &RelationEndPointId,
        data: LoadedEndPointData,
    ) -> Result<()> {
        match (self.get_or_create_virtual_end_point(id)?, data) {
            (RelationEndPoint::VirtualObject(end_point), LoadedEndPointData::Object(item)) => {
                end_point.mark_data_complete(item)
            }
            (RelationEndPoint::Collection(end_point), LoadedEndPointData::Collection(items)) => {
                end_point.mark_data_complete(items)
            }
            (end_point, _) => Err(Error::contract(format!(
                "The loaded data does not match the end point '{}'.",
                end_point.id()
            ))),
        }
    }

    fn check_not_registered(&self, id: &RelationEndPointId) -> Result<()> {
        if self.end_points.contains_key(id) {
            return Err(Error::invalid_operation(format!(
                "The end point '{}' has already been registered.",
                id
            )));
        }
        Ok(())
    }

    fn create_incomplete_end_point(&self, id: &RelationEndPointId) -> Result<RelationEndPoint> {
        let definition = id.definition();
        if definition.is_virtual_object() {
            Ok(RelationEndPoint::VirtualObject(VirtualObjectEndPoint::new_incomplete(
                id.clone(),
                Arc::clone(&self.event_sink),
                Arc::clone(&self.loader),
                Arc::clone(&self.data_manager_factory),
            )?))
        } else if definition.is_collection() {
            Ok(RelationEndPoint::Collection(CollectionEndPoint::new_incomplete(
                id.clone(),
                Arc::clone(&self.event_sink),
                Arc::clone(&self.loader),
                Arc::clone(&self.data_manager_factory),
            )?))
        } else {
            Err(Error::EndPointNotFound(id.clone()))
        }
    }

    fn create_new_end_point(&self, id: RelationEndPointId) -> Result<RelationEndPoint> {
        let sink = Arc::clone(&self.event_sink);
        let definition = id.definition().clone();
        if definition.is_real_object() {
            Ok(RelationEndPoint::RealObject(RealObjectEndPoint::new(id, None, sink)?))
        } else if definition.is_collection() {
            let data_manager = self.data_manager_factory.create_collection_data_manager(&id);
            Ok(RelationEndPoint::Collection(CollectionEndPoint::new_complete(
                id,
                sink,
                data_manager,
            )?))
        } else {
            let data_manager = self
                .data_manager_factory
                .create_virtual_object_data_manager(&id);
            Ok(RelationEndPoint::VirtualObject(VirtualObjectEndPoint::new_complete(
                id,
                sink,
                data_manager,
            )?))
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Command setting the scalar end point `id`
    pub fn create_set_command(
        &mut self,
        id: &RelationEndPointId,
        new_value: Option<ObjectId>,
    ) -> Result<DataManagementCommand> {
        factory::create_set_command(self, id, new_value)
    }

    /// Command inserting into the collection `id`
    pub fn create_insert_command(
        &mut self,
        id: &RelationEndPointId,
        index: usize,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        factory::create_insert_command(self, id, index, item)
    }

    /// Command appending to the collection `id`
    pub fn create_add_command(
        &mut self,
        id: &RelationEndPointId,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        factory::create_add_command(self, id, item)
    }

    /// Command removing from the collection `id`
    pub fn create_remove_command(
        &mut self,
        id: &RelationEndPointId,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        factory::create_remove_command(self, id, item)
    }

    /// Command replacing an item of the collection `id`
    pub fn create_replace_command(
        &mut self,
        id: &RelationEndPointId,
        index: usize,
        item: ObjectId,
    ) -> Result<DataManagementCommand> {
        factory::create_replace_command(self, id, index, item)
    }

    /// Command replacing the content of the collection `id`
    pub fn create_set_collection_command(
        &mut self,
        id: &RelationEndPointId,
        items: Vec<ObjectId>,
    ) -> Result<DataManagementCommand> {
        factory::create_set_collection_command(self, id, items)
    }

    /// Expanded commands detaching `object_id` from every relation in
    /// `definitions`
    ///
    /// Failures creating a single end point's commands are recorded as
    /// exception commands, so `get_all_exceptions` reports all of them before
    /// anything runs.
    pub fn create_object_delete_command(
        &mut self,
        object_id: &ObjectId,
        definitions: &[RelationEndPointDefinition],
    ) -> ExpandedCommand {
        let mut composite = ExpandedCommand::new();
        for definition in definitions.iter().filter(|d| !d.is_anonymous()) {
            let expanded = RelationEndPointId::new(object_id.clone(), definition.clone())
                .and_then(|id| factory::create_delete_command(self, &id))
                .and_then(|command| command.expand_to_all_related_objects(self));
            match expanded {
                Ok(expanded) => composite.extend(expanded),
                Err(error) => composite.push(DataManagementCommand::Exception(error)),
            }
        }
        composite
    }

    /// Expand `command` and execute the expansion
    pub fn execute(&mut self, command: DataManagementCommand) -> Result<()> {
        let expanded = command.expand_to_all_related_objects(self)?;
        expanded.notify_and_perform(self)
    }

    /// Set the scalar end point `id` and update the opposite side
    pub fn set_related_object(
        &mut self,
        id: &RelationEndPointId,
        new_value: Option<ObjectId>,
    ) -> Result<()> {
        let command = self.create_set_command(id, new_value)?;
        self.execute(command)
    }

    /// Insert into the collection `id` and update the opposite side
    pub fn insert_related_object(
        &mut self,
        id: &RelationEndPointId,
        index: usize,
        item: ObjectId,
    ) -> Result<()> {
        let command = self.create_insert_command(id, index, item)?;
        self.execute(command)
    }

    /// Append to the collection `id` and update the opposite side
    pub fn add_related_object(&mut self, id: &RelationEndPointId, item: ObjectId) -> Result<()> {
        let command = self.create_add_command(id, item)?;
        self.execute(command)
    }

    /// Remove from the collection `id` and update the opposite side
    pub fn remove_related_object(&mut self, id: &RelationEndPointId, item: ObjectId) -> Result<()> {
        let command = self.create_remove_command(id, item)?;
        self.execute(command)
    }

    /// Replace an item of the collection `id` and update the opposite side
    pub fn replace_related_object(
        &mut self,
        id: &RelationEndPointId,
        index: usize,
        item: ObjectId,
    ) -> Result<()> {
        let command = self.create_replace_command(id, index, item)?;
        self.execute(command)
    }

    /// Replace the content of the collection `id` and update the opposite side
    pub fn set_related_objects(
        &mut self,
        id: &RelationEndPointId,
        items: Vec<ObjectId>,
    ) -> Result<()> {
        let command = self.create_set_collection_command(id, items)?;
        self.execute(command)
    }

    /// Detach a deleted object from all of its relations
    pub fn delete_object(
        &mut self,
        object_id: &ObjectId,
        definitions: &[RelationEndPointDefinition],
    ) -> Result<()> {
        let composite = self.create_object_delete_command(object_id, definitions);
        composite.notify_and_perform(self)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current related object of the scalar end point `id`
    pub fn get_related_object(&mut self, id: &RelationEndPointId) -> Result<Option<ObjectId>> {
        factory::get_related_object(self, id)
    }

    /// Original related object of the scalar end point `id`
    pub fn get_original_related_object(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<Option<ObjectId>> {
        match self.get_end_point_with_lazy_load(id)? {
            RelationEndPoint::RealObject(end_point) => Ok(end_point.get_original_data().cloned()),
            RelationEndPoint::VirtualObject(end_point) => {
                Ok(end_point.get_original_data()?.cloned())
            }
            RelationEndPoint::Collection(end_point) => Err(Error::contract(format!(
                "'{}' is a collection end point and has no single related object.",
                end_point.id()
            ))),
        }
    }

    /// Current items of the collection `id`
    pub fn get_related_objects(&mut self, id: &RelationEndPointId) -> Result<Vec<ObjectId>> {
        Ok(self
            .get_end_point_with_lazy_load(id)?
            .collection_mut()?
            .get_data()?
            .to_vec())
    }

    /// Items of the collection `id` as of the last commit
    pub fn get_original_related_objects(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<Vec<ObjectId>> {
        Ok(self
            .get_end_point_with_lazy_load(id)?
            .collection_mut()?
            .get_original_data()?
            .to_vec())
    }

    /// True if any end point has uncommitted changes
    pub fn has_changed(&self) -> bool {
        self.end_points.values().any(RelationEndPoint::has_changed)
    }

    /// Ids of the end points with uncommitted changes
    pub fn changed_end_point_ids(&self) -> Vec<RelationEndPointId> {
        self.end_points
            .values()
            .filter(|end_point| end_point.has_changed())
            .map(|end_point| end_point.id().clone())
            .collect()
    }

    /// True if the end point `id` is registered and was touched
    pub fn has_been_touched(&self, id: &RelationEndPointId) -> bool {
        self.end_points
            .get(id)
            .is_some_and(RelationEndPoint::has_been_touched)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Make the current data of every end point its original data
    pub fn commit_all_end_points(&mut self) {
        let changed = self.end_points.values().filter(|e| e.has_changed()).count();
        for end_point in self.end_points.values_mut() {
            end_point.commit();
        }
        info!(target: "relata::manager", changed, "Committed end points");
    }

    /// Discard the pending edits of every end point
    pub fn rollback_all_end_points(&mut self) {
        let changed = self.end_points.values().filter(|e| e.has_changed()).count();
        for end_point in self.end_points.values_mut() {
            end_point.rollback();
        }
        info!(target: "relata::manager", changed, "Rolled back end points");
    }

    /// Whether the end point `id` agrees with its opposite side
    pub fn is_synchronized(&mut self, id: &RelationEndPointId) -> Result<bool> {
        sync::is_synchronized(self, id)
    }

    /// Bring the end point `id` in line with its opposite side
    pub fn synchronize(&mut self, id: &RelationEndPointId) -> Result<()> {
        sync::synchronize(self, id)
    }

    /// Adopt the changed and touched end points of a subordinate transaction
    ///
    /// End points missing here belong to objects created in the subordinate
    /// transaction and are created complete and empty first. Real end points
    /// are taken over before virtual ones, so the virtual data resolves its
    /// opposite end points in this transaction.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` before adopting anything if lazy
    /// loading is disabled and a target end point is incomplete. Propagates
    /// load failures of incomplete end points and contract violations for end
    /// points of a different kind.
    pub fn commit_sub_transaction(&mut self, sub: &RelationEndPointManager) -> Result<()> {
        let mut sources: Vec<&RelationEndPoint> = sub
            .end_points
            .values()
            .filter(|end_point| end_point.has_changed() || end_point.has_been_touched())
            .collect();
        sources.sort_by_key(|end_point| end_point.is_virtual());

        if !self.config.lazy_load {
            let incomplete = sources.iter().map(|source| source.id()).find(|id| {
                self.end_points
                    .get(*id)
                    .is_some_and(|end_point| !end_point.is_data_complete())
            });
            if let Some(id) = incomplete {
                return Err(lazy_load_disabled(id));
            }
        }

        for source in &sources {
            let id = source.id();
            match self.end_points.get_mut(id) {
                Some(end_point) => end_point.ensure_data_complete()?,
                None => {
                    let end_point = self.create_new_end_point(id.clone())?;
                    self.end_points.insert(id.clone(), end_point);
                }
            }
            let Some(mut target) = self.end_points.remove(id) else {
                return Err(Error::EndPointNotFound(id.clone()));
            };
            let result = target.set_data_from_sub_transaction(source, &*self);
            self.end_points.insert(id.clone(), target);
            result?;
        }
        debug!(
            target: "relata::manager",
            end_points = sources.len(),
            "Committed subordinate transaction"
        );
        Ok(())
    }
}

fn lazy_load_disabled(id: &RelationEndPointId) -> Error {
    Error::invalid_operation(format!(
        "The data of end point '{}' is not loaded and lazy loading is disabled.",
        id
    ))
}

impl RelationEndPointProvider for RelationEndPointManager {
    fn get_end_point_without_loading(&self, id: &RelationEndPointId) -> Option<&RelationEndPoint> {
        self.end_points.get(id)
    }

    fn get_end_point_mut(&mut self, id: &RelationEndPointId) -> Option<&mut RelationEndPoint> {
        self.end_points.get_mut(id)
    }

    fn get_end_point_with_lazy_load(
        &mut self,
        id: &RelationEndPointId,
    ) -> Result<&mut RelationEndPoint> {
        if !id.definition().is_virtual() {
            return self
                .end_points
                .get_mut(id)
                .ok_or_else(|| Error::EndPointNotFound(id.clone()));
        }
        let lazy_load = self.config.lazy_load;
        let end_point = self.get_or_create_virtual_end_point(id)?;
        if !end_point.is_data_complete() {
            if !lazy_load {
                return Err(lazy_load_disabled(id));
            }
            end_point.ensure_data_complete()?;
        }
        Ok(end_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::OrderModel;
    use relata_core::ChangeDetection;

    #[test]
    fn test_register_real_end_point_buffers_on_opposite() {
        let model = OrderModel::new();
        let mut manager = model.manager();
        manager
            .register_real_object_end_point(model.order_customer_of(1), Some(model.customer(1)))
            .unwrap();

        let collection = manager
            .get_end_point_without_loading(&model.customer_orders_of(1))
            .unwrap();
        assert!(!collection.is_data_complete());
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_double_registration_fails() {
        let model = OrderModel::new();
        let mut manager = model.manager();
        manager
            .register_real_object_end_point(model.order_customer_of(1), None)
            .unwrap();
        let err = manager
            .register_real_object_end_point(model.order_customer_of(1), None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_unregister_real_end_point() {
        let model = OrderModel::new();
        let mut manager = model.manager();
        manager
            .register_real_object_end_point(model.order_customer_of(1), Some(model.customer(1)))
            .unwrap();
        manager
            .unregister_real_object_end_point(&model.order_customer_of(1))
            .unwrap();

        assert!(!manager.contains(&model.order_customer_of(1)));
        model
            .loader()
            .set_collection(model.customer_orders_of(1), vec![]);
        assert!(manager
            .get_related_objects(&model.customer_orders_of(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unregister_changed_end_point_fails() {
        let model = OrderModel::new();
        let mut manager = model.manager();
        manager
            .register_end_points_for_new_object(&model.order(1), &model.order_definitions())
            .unwrap();
        manager
            .register_end_points_for_new_object(&model.customer(1), &model.customer_definitions())
            .unwrap();
        manager
            .set_related_object(&model.order_customer_of(1), Some(model.customer(1)))
            .unwrap();

        let err = manager
            .unregister_real_object_end_point(&model.order_customer_of(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_new_object_end_points_are_complete() {
        let model = OrderModel::new();
        let mut manager = model.manager();
        manager
            .register_end_points_for_new_object(&model.order(1), &model.order_definitions())
            .unwrap();

        assert!(manager
            .end_points()
            .all(|end_point| end_point.is_data_complete()));
        assert_eq!(manager.get_related_object(&model.order_ticket_of(1)).unwrap(), None);
        assert_eq!(model.loader().total_load_count(), 0);
    }

    #[test]
    fn test_lazy_load_disabled() {
        let model = OrderModel::new();
        let mut manager = model.manager_with_config(TrackingConfig {
            change_detection: ChangeDetection::Set,
            lazy_load: false,
        });
        let err = manager
            .get_related_objects(&model.customer_orders_of(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert_eq!(model.loader().total_load_count(), 0);

        manager
            .mark_data_complete(
                &model.customer_orders_of(1),
                LoadedEndPointData::Collection(vec![]),
            )
            .unwrap();
        assert!(manager
            .get_related_objects(&model.customer_orders_of(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mark_data_complete_with_wrong_shape() {
        let model = OrderModel::new();
        let mut manager = model.manager();
        let err = manager
            .mark_data_complete(&model.order_ticket_of(1), LoadedEndPointData::Collection(vec![]))
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_commit_and_rollback_all() {
        let model = OrderModel::new();
        let mut manager = model.manager();
        manager
            .register_end_points_for_new_object(&model.order(1), &model.order_definitions())
            .unwrap();
        manager
            .register_end_points_for_new_object(&model.customer(1), &model.customer_definitions())
            .unwrap();

        manager
            .set_related_object(&model.order_customer_of(1), Some(model.customer(1)))
            .unwrap();
        assert!(manager.has_changed());
        assert_eq!(manager.changed_end_point_ids().len(), 2);

        manager.rollback_all_end_points();
        assert!(!manager.has_changed());
        assert!(manager
            .get_related_objects(&model.customer_orders_of(1))
            .unwrap()
            .is_empty());

        manager
            .set_related_object(&model.order_customer_of(1), Some(model.customer(1)))
            .unwrap();
        manager.commit_all_end_points();
        assert!(!manager.has_changed());
        assert_eq!(
            manager
                .get_original_related_object(&model.order_customer_of(1))
                .unwrap(),
            Some(model.customer(1))
        );
        assert!(!manager.has_been_touched(&model.order_customer_of(1)));
    }

    #[test]
    fn test_commit_sub_transaction() {
        let model = OrderModel::new();
        let mut parent = model.manager();
        parent
            .register_end_points_for_new_object(&model.order(1), &model.order_definitions())
            .unwrap();
        parent
            .register_end_points_for_new_object(&model.customer(1), &model.customer_definitions())
            .unwrap();
        parent.commit_all_end_points();

        let mut sub = model.manager_with_config(TrackingConfig::for_sub_transaction());
        sub.register_end_points_for_new_object(&model.order(1), &model.order_definitions())
            .unwrap();
        sub.register_end_points_for_new_object(&model.customer(1), &model.customer_definitions())
            .unwrap();
        sub.set_related_object(&model.order_customer_of(1), Some(model.customer(1)))
            .unwrap();

        parent.commit_sub_transaction(&sub).unwrap();

        assert_eq!(
            parent.get_related_object(&model.order_customer_of(1)).unwrap(),
            Some(model.customer(1))
        );
        assert_eq!(
            parent.get_related_objects(&model.customer_orders_of(1)).unwrap(),
            vec![model.order(1)]
        );
        assert!(parent.has_been_touched(&model.customer_orders_of(1)));
        assert!(parent.has_changed());
    }
}

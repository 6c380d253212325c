//! Commands on scalar (real and virtual object) end points

use super::{
    end_point_mut, factory, DataManagementCommand, ExpandedCommand, RelationEndPointTouchCommand,
};
use crate::end_point::{check_related_class, RelationEndPoint};
use crate::provider::RelationEndPointProvider;
use relata_core::{
    display_related, Error, ObjectId, RelationEndPointId, RelationKind, Result,
    TransactionEventSink,
};
use std::sync::Arc;

/// Set a scalar end point to a different related object
#[derive(Debug, Clone)]
pub struct ObjectEndPointSetCommand {
    end_point_id: RelationEndPointId,
    old_related: Option<ObjectId>,
    new_related: Option<ObjectId>,
    kind: RelationKind,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl ObjectEndPointSetCommand {
    /// Create a set command for a relation of `kind`
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not scalar,
    /// `kind` is not the end point's relation kind, the values are equal
    /// (use `ObjectEndPointSetSameCommand`), or the new value is not of the
    /// opposite class.
    pub fn new(
        end_point_id: RelationEndPointId,
        old_related: Option<ObjectId>,
        new_related: Option<ObjectId>,
        kind: RelationKind,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_scalar(&end_point_id)?;
        let actual = end_point_id.definition().relation_kind();
        if actual != kind {
            return Err(Error::contract(format!(
                "A {:?} set command cannot modify '{}', which belongs to a {:?} relation.",
                kind, end_point_id, actual
            )));
        }
        if old_related == new_related {
            return Err(Error::contract(format!(
                "Setting '{}' to its current value '{}' requires a same-value command.",
                end_point_id,
                display_related(new_related.as_ref())
            )));
        }
        if let Some(related) = &new_related {
            check_related_class(&end_point_id, related)?;
        }
        Ok(Self {
            end_point_id,
            old_related,
            new_related,
            kind,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Related object before the change
    pub fn old_related(&self) -> Option<&ObjectId> {
        self.old_related.as_ref()
    }

    /// Related object after the change
    pub fn new_related(&self) -> Option<&ObjectId> {
        self.new_related.as_ref()
    }

    /// Kind of the modified relation
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub(crate) fn begin(&self) {
        self.event_sink.relation_changing(
            self.end_point_id.object_id(),
            &self.end_point_id,
            self.old_related.as_ref(),
            self.new_related.as_ref(),
        );
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        set_related_object(
            end_point_mut(provider, &self.end_point_id)?,
            self.new_related.clone(),
        )
    }

    pub(crate) fn end(&self) {
        self.event_sink.relation_changed(
            self.end_point_id.object_id(),
            &self.end_point_id,
            self.old_related.as_ref(),
            self.new_related.as_ref(),
        );
    }

    pub(crate) fn expand(
        self,
        provider: &mut dyn RelationEndPointProvider,
    ) -> Result<ExpandedCommand> {
        match self.kind {
            RelationKind::Unidirectional => {
                Ok(ExpandedCommand::from(DataManagementCommand::ObjectSet(self)))
            }
            RelationKind::OneToOne => self.expand_one_to_one(provider),
            RelationKind::OneToMany => self.expand_one_to_many(provider),
        }
    }

    // new related <- owner, this, old related -> null, previous owner of new related -> null
    fn expand_one_to_one(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let owner = self.end_point_id.object_id().clone();
        let mut expanded = ExpandedCommand::new();
        let mut vacated = None;

        if let Some(new_related) = &self.new_related {
            if let Some(new_related_end_point) = self.end_point_id.opposite_for(new_related)? {
                let previous_owner = factory::get_related_object(provider, &new_related_end_point)?;
                if let Some(previous_owner) = previous_owner {
                    if previous_owner != owner {
                        vacated = Some(RelationEndPointId::new(
                            previous_owner,
                            self.end_point_id.definition().clone(),
                        )?);
                    }
                }
                expanded.push(factory::create_set_command(
                    provider,
                    &new_related_end_point,
                    Some(owner.clone()),
                )?);
            }
        }

        let old_related_end_point = match &self.old_related {
            Some(old_related) => self.end_point_id.opposite_for(old_related)?,
            None => None,
        };
        expanded.push(DataManagementCommand::ObjectSet(self));

        if let Some(old_related_end_point) = old_related_end_point {
            expanded.push(factory::create_set_command(provider, &old_related_end_point, None)?);
        }
        if let Some(vacated) = vacated {
            expanded.push(factory::create_set_command(provider, &vacated, None)?);
        }
        Ok(expanded)
    }

    // new collection <- add owner, this, old collection -> remove owner
    fn expand_one_to_many(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let owner = self.end_point_id.object_id().clone();
        let mut expanded = ExpandedCommand::new();

        if let Some(new_related) = &self.new_related {
            if let Some(new_collection) = self.end_point_id.opposite_for(new_related)? {
                expanded.push(factory::create_add_command(provider, &new_collection, owner.clone())?);
            }
        }
        let old_collection = match &self.old_related {
            Some(old_related) => self.end_point_id.opposite_for(old_related)?,
            None => None,
        };
        expanded.push(DataManagementCommand::ObjectSet(self));
        if let Some(old_collection) = old_collection {
            expanded.push(factory::create_remove_command(provider, &old_collection, owner)?);
        }
        Ok(expanded)
    }
}

/// Set a scalar end point to the object it already refers to
///
/// Raises no notifications; performing it only touches the end point.
#[derive(Debug, Clone)]
pub struct ObjectEndPointSetSameCommand {
    end_point_id: RelationEndPointId,
    related: Option<ObjectId>,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl ObjectEndPointSetSameCommand {
    /// Create a same-value command
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not scalar or
    /// the values differ.
    pub fn new(
        end_point_id: RelationEndPointId,
        old_related: Option<ObjectId>,
        new_related: Option<ObjectId>,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_scalar(&end_point_id)?;
        if old_related != new_related {
            return Err(Error::contract(format!(
                "A same-value command for '{}' cannot change '{}' to '{}'.",
                end_point_id,
                display_related(old_related.as_ref()),
                display_related(new_related.as_ref())
            )));
        }
        Ok(Self {
            end_point_id,
            related: new_related,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// The unchanged related object
    pub fn related(&self) -> Option<&ObjectId> {
        self.related.as_ref()
    }

    /// Sink the command was created with
    pub fn event_sink(&self) -> &Arc<dyn TransactionEventSink> {
        &self.event_sink
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        end_point_mut(provider, &self.end_point_id)?.touch();
        Ok(())
    }

    // this, touch of the related object's opposite end point if it is registered
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let opposite = match &self.related {
            Some(related) => self.end_point_id.opposite_for(related)?,
            None => None,
        };
        let mut expanded = ExpandedCommand::from(DataManagementCommand::ObjectSetSame(self));
        if let Some(opposite) = opposite {
            if provider.get_end_point_without_loading(&opposite).is_some() {
                expanded.push(DataManagementCommand::Touch(RelationEndPointTouchCommand::new(
                    opposite,
                )));
            }
        }
        Ok(expanded)
    }
}

/// Clear a scalar end point because its owner is deleted
///
/// Raises no notifications; the owner's deletion is announced elsewhere.
#[derive(Debug, Clone)]
pub struct ObjectEndPointDeleteCommand {
    end_point_id: RelationEndPointId,
    old_related: Option<ObjectId>,
    event_sink: Arc<dyn TransactionEventSink>,
}

impl ObjectEndPointDeleteCommand {
    /// Create a delete command
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the end point is not scalar.
    pub fn new(
        end_point_id: RelationEndPointId,
        old_related: Option<ObjectId>,
        event_sink: Arc<dyn TransactionEventSink>,
    ) -> Result<Self> {
        check_scalar(&end_point_id)?;
        Ok(Self {
            end_point_id,
            old_related,
            event_sink,
        })
    }

    /// Modified end point
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    /// Related object before the deletion
    pub fn old_related(&self) -> Option<&ObjectId> {
        self.old_related.as_ref()
    }

    /// Sink the command was created with
    pub fn event_sink(&self) -> &Arc<dyn TransactionEventSink> {
        &self.event_sink
    }

    pub(crate) fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        set_related_object(end_point_mut(provider, &self.end_point_id)?, None)
    }

    // this, detach the owner from the related object's opposite end point
    pub(crate) fn expand(self, provider: &mut dyn RelationEndPointProvider) -> Result<ExpandedCommand> {
        let owner = self.end_point_id.object_id().clone();
        let opposite = match &self.old_related {
            Some(related) => self.end_point_id.opposite_for(related)?,
            None => None,
        };
        let mut expanded = ExpandedCommand::from(DataManagementCommand::ObjectDelete(self));
        if let Some(opposite) = opposite {
            let detach = if opposite.definition().is_collection() {
                factory::create_remove_command(provider, &opposite, owner)?
            } else {
                factory::create_set_command(provider, &opposite, None)?
            };
            expanded.push(detach);
        }
        Ok(expanded)
    }
}

fn set_related_object(end_point: &mut RelationEndPoint, value: Option<ObjectId>) -> Result<()> {
    match end_point {
        RelationEndPoint::RealObject(real) => {
            real.set_opposite_object_id(value);
            real.touch();
        }
        RelationEndPoint::VirtualObject(virtual_object) => {
            virtual_object.data_manager_mut()?.set_current_value(value)?;
            virtual_object.touch();
        }
        RelationEndPoint::Collection(collection) => {
            return Err(Error::contract(format!(
                "'{}' is a collection end point and cannot be set to a single object.",
                collection.id()
            )));
        }
    }
    Ok(())
}

fn check_scalar(end_point_id: &RelationEndPointId) -> Result<()> {
    if end_point_id.definition().is_collection() {
        return Err(Error::contract(format!(
            "'{}' is a collection end point; object end point commands cannot modify it.",
            end_point_id
        )));
    }
    Ok(())
}

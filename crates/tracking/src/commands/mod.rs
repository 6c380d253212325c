//! Data management commands
//!
//! A command describes one single-sided relation mutation. Executing it is a
//! three-phase protocol:
//!
//! 1. `begin`: raise the "changing" notifications
//! 2. `perform`: mutate exactly the modified end point and touch it
//! 3. `end`: raise the "changed" notifications
//!
//! `expand_to_all_related_objects` turns a command into an `ExpandedCommand`
//! that also updates every directly affected opposite end point, so both
//! sides of the relation stay consistent once it has run.

pub mod collection;
pub mod expanded;
pub mod factory;
pub mod object;

pub use collection::{
    CollectionEndPointDeleteCommand, CollectionEndPointInsertCommand,
    CollectionEndPointRemoveCommand, CollectionEndPointReplaceCommand,
    CollectionEndPointReplaceSameCommand, CollectionEndPointSetCollectionCommand,
};
pub use expanded::ExpandedCommand;
pub use object::{ObjectEndPointDeleteCommand, ObjectEndPointSetCommand, ObjectEndPointSetSameCommand};

use crate::end_point::RelationEndPoint;
use crate::provider::RelationEndPointProvider;
use relata_core::{Error, RelationEndPointId, Result};

/// Closed set of end-point mutations
#[derive(Debug, Clone)]
pub enum DataManagementCommand {
    /// Scalar end point gets a different related object
    ObjectSet(ObjectEndPointSetCommand),
    /// Scalar end point is set to its current value
    ObjectSetSame(ObjectEndPointSetSameCommand),
    /// Scalar end point is cleared because its owner is deleted
    ObjectDelete(ObjectEndPointDeleteCommand),
    /// Object inserted into a collection
    CollectionInsert(CollectionEndPointInsertCommand),
    /// Object removed from a collection
    CollectionRemove(CollectionEndPointRemoveCommand),
    /// Collection item replaced by another object
    CollectionReplace(CollectionEndPointReplaceCommand),
    /// Collection item replaced by itself
    CollectionReplaceSame(CollectionEndPointReplaceSameCommand),
    /// Whole collection content replaced
    CollectionSetCollection(CollectionEndPointSetCollectionCommand),
    /// Collection cleared because its owner is deleted
    CollectionDelete(CollectionEndPointDeleteCommand),
    /// End point marked as accessed without changing data
    Touch(RelationEndPointTouchCommand),
    /// Does nothing
    Nop,
    /// Deferred error; fails `begin` and is reported by `get_all_exceptions`
    Exception(Error),
}

impl DataManagementCommand {
    /// Errors that would prevent this command from executing
    pub fn get_all_exceptions(&self) -> Vec<&Error> {
        match self {
            DataManagementCommand::Exception(error) => vec![error],
            _ => Vec::new(),
        }
    }

    /// Raise the "changing" notifications
    ///
    /// # Errors
    /// Returns the deferred error of an `Exception` command.
    pub fn begin(&self) -> Result<()> {
        match self {
            DataManagementCommand::ObjectSet(c) => c.begin(),
            DataManagementCommand::CollectionInsert(c) => c.begin(),
            DataManagementCommand::CollectionRemove(c) => c.begin(),
            DataManagementCommand::CollectionReplace(c) => c.begin(),
            DataManagementCommand::CollectionSetCollection(c) => c.begin(),
            DataManagementCommand::Exception(error) => return Err(error.clone()),
            DataManagementCommand::ObjectSetSame(_)
            | DataManagementCommand::ObjectDelete(_)
            | DataManagementCommand::CollectionReplaceSame(_)
            | DataManagementCommand::CollectionDelete(_)
            | DataManagementCommand::Touch(_)
            | DataManagementCommand::Nop => {}
        }
        Ok(())
    }

    /// Mutate the modified end point
    ///
    /// # Errors
    /// Returns `Error::EndPointNotFound` if the end point is not registered
    /// with `provider`, or the deferred error of an `Exception` command.
    pub fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        match self {
            DataManagementCommand::ObjectSet(c) => c.perform(provider),
            DataManagementCommand::ObjectSetSame(c) => c.perform(provider),
            DataManagementCommand::ObjectDelete(c) => c.perform(provider),
            DataManagementCommand::CollectionInsert(c) => c.perform(provider),
            DataManagementCommand::CollectionRemove(c) => c.perform(provider),
            DataManagementCommand::CollectionReplace(c) => c.perform(provider),
            DataManagementCommand::CollectionReplaceSame(c) => c.perform(provider),
            DataManagementCommand::CollectionSetCollection(c) => c.perform(provider),
            DataManagementCommand::CollectionDelete(c) => c.perform(provider),
            DataManagementCommand::Touch(c) => c.perform(provider),
            DataManagementCommand::Nop => Ok(()),
            DataManagementCommand::Exception(error) => Err(error.clone()),
        }
    }

    /// Raise the "changed" notifications
    ///
    /// # Errors
    /// Returns the deferred error of an `Exception` command.
    pub fn end(&self) -> Result<()> {
        match self {
            DataManagementCommand::ObjectSet(c) => c.end(),
            DataManagementCommand::CollectionInsert(c) => c.end(),
            DataManagementCommand::CollectionRemove(c) => c.end(),
            DataManagementCommand::CollectionReplace(c) => c.end(),
            DataManagementCommand::CollectionSetCollection(c) => c.end(),
            DataManagementCommand::Exception(error) => return Err(error.clone()),
            DataManagementCommand::ObjectSetSame(_)
            | DataManagementCommand::ObjectDelete(_)
            | DataManagementCommand::CollectionReplaceSame(_)
            | DataManagementCommand::CollectionDelete(_)
            | DataManagementCommand::Touch(_)
            | DataManagementCommand::Nop => {}
        }
        Ok(())
    }

    /// Run `begin`, `perform` and `end` unless the command carries an error
    pub fn notify_and_perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        if let Some(error) = self.get_all_exceptions().into_iter().next() {
            return Err(error.clone());
        }
        self.begin()?;
        self.perform(provider)?;
        self.end()
    }

    /// Bundle this command with the commands updating the opposite end points
    ///
    /// Opposite end points are lazily loaded through `provider`. Touch, no-op
    /// and exception commands expand to themselves.
    ///
    /// # Errors
    /// Propagates failures creating the opposite-side commands: load errors,
    /// `Error::OutOfSync` and `Error::EndPointNotFound`.
    pub fn expand_to_all_related_objects(
        self,
        provider: &mut dyn RelationEndPointProvider,
    ) -> Result<ExpandedCommand> {
        match self {
            DataManagementCommand::ObjectSet(c) => c.expand(provider),
            DataManagementCommand::ObjectSetSame(c) => c.expand(provider),
            DataManagementCommand::ObjectDelete(c) => c.expand(provider),
            DataManagementCommand::CollectionInsert(c) => c.expand(provider),
            DataManagementCommand::CollectionRemove(c) => c.expand(provider),
            DataManagementCommand::CollectionReplace(c) => c.expand(provider),
            DataManagementCommand::CollectionReplaceSame(c) => c.expand(provider),
            DataManagementCommand::CollectionSetCollection(c) => c.expand(provider),
            DataManagementCommand::CollectionDelete(c) => c.expand(provider),
            other @ (DataManagementCommand::Touch(_)
            | DataManagementCommand::Nop
            | DataManagementCommand::Exception(_)) => Ok(ExpandedCommand::from(other)),
        }
    }

    /// End point modified by this command
    pub fn end_point_id(&self) -> Option<&RelationEndPointId> {
        match self {
            DataManagementCommand::ObjectSet(c) => Some(c.end_point_id()),
            DataManagementCommand::ObjectSetSame(c) => Some(c.end_point_id()),
            DataManagementCommand::ObjectDelete(c) => Some(c.end_point_id()),
            DataManagementCommand::CollectionInsert(c) => Some(c.end_point_id()),
            DataManagementCommand::CollectionRemove(c) => Some(c.end_point_id()),
            DataManagementCommand::CollectionReplace(c) => Some(c.end_point_id()),
            DataManagementCommand::CollectionReplaceSame(c) => Some(c.end_point_id()),
            DataManagementCommand::CollectionSetCollection(c) => Some(c.end_point_id()),
            DataManagementCommand::CollectionDelete(c) => Some(c.end_point_id()),
            DataManagementCommand::Touch(c) => Some(c.end_point_id()),
            DataManagementCommand::Nop | DataManagementCommand::Exception(_) => None,
        }
    }

    /// Short variant name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            DataManagementCommand::ObjectSet(_) => "ObjectSet",
            DataManagementCommand::ObjectSetSame(_) => "ObjectSetSame",
            DataManagementCommand::ObjectDelete(_) => "ObjectDelete",
            DataManagementCommand::CollectionInsert(_) => "CollectionInsert",
            DataManagementCommand::CollectionRemove(_) => "CollectionRemove",
            DataManagementCommand::CollectionReplace(_) => "CollectionReplace",
            DataManagementCommand::CollectionReplaceSame(_) => "CollectionReplaceSame",
            DataManagementCommand::CollectionSetCollection(_) => "CollectionSetCollection",
            DataManagementCommand::CollectionDelete(_) => "CollectionDelete",
            DataManagementCommand::Touch(_) => "Touch",
            DataManagementCommand::Nop => "Nop",
            DataManagementCommand::Exception(_) => "Exception",
        }
    }
}

/// Touch an end point without changing its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEndPointTouchCommand {
    end_point_id: RelationEndPointId,
}

impl RelationEndPointTouchCommand {
    /// Touch command for `end_point_id`
    pub fn new(end_point_id: RelationEndPointId) -> Self {
        Self { end_point_id }
    }

    /// End point to touch
    pub fn end_point_id(&self) -> &RelationEndPointId {
        &self.end_point_id
    }

    fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        end_point_mut(provider, &self.end_point_id)?.touch();
        Ok(())
    }
}

/// Registered end point addressed by a command
pub(crate) fn end_point_mut<'a>(
    provider: &'a mut dyn RelationEndPointProvider,
    id: &RelationEndPointId,
) -> Result<&'a mut RelationEndPoint> {
    provider
        .get_end_point_mut(id)
        .ok_or_else(|| Error::EndPointNotFound(id.clone()))
}

//! Ordered bundles of commands executed as one unit

use super::DataManagementCommand;
use crate::provider::RelationEndPointProvider;
use relata_core::{Error, Result};
use tracing::trace;

/// Commands that together keep both sides of a relation consistent
///
/// Each phase runs over all commands in construction order: every `begin`
/// precedes every `perform`, which precedes every `end`. A failure stops
/// execution; already performed commands are not undone.
#[derive(Debug, Clone, Default)]
pub struct ExpandedCommand {
    commands: Vec<DataManagementCommand>,
}

impl ExpandedCommand {
    /// Empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands in execution order
    pub fn commands(&self) -> &[DataManagementCommand] {
        &self.commands
    }

    /// Consume the bundle
    pub fn into_commands(self) -> Vec<DataManagementCommand> {
        self.commands
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if the bundle does nothing
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Append a command; no-op commands are dropped
    pub fn push(&mut self, command: DataManagementCommand) {
        if !matches!(command, DataManagementCommand::Nop) {
            self.commands.push(command);
        }
    }

    /// Append all commands of `other`
    pub fn extend(&mut self, other: ExpandedCommand) {
        self.commands.extend(other.commands);
    }

    /// Errors of every contained command
    pub fn get_all_exceptions(&self) -> Vec<&Error> {
        self.commands
            .iter()
            .flat_map(|command| command.get_all_exceptions())
            .collect()
    }

    /// Run `begin` on every command
    pub fn begin(&self) -> Result<()> {
        for command in &self.commands {
            trace!(target: "relata::command", command = command.name(), "begin");
            command.begin()?;
        }
        Ok(())
    }

    /// Run `perform` on every command
    pub fn perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        for command in &self.commands {
            trace!(target: "relata::command", command = command.name(), "perform");
            command.perform(provider)?;
        }
        Ok(())
    }

    /// Run `end` on every command
    pub fn end(&self) -> Result<()> {
        for command in &self.commands {
            trace!(target: "relata::command", command = command.name(), "end");
            command.end()?;
        }
        Ok(())
    }

    /// Execute all three phases
    ///
    /// # Errors
    /// Returns the first contained exception before any notification is
    /// raised; otherwise the first failure of any phase.
    pub fn notify_and_perform(&self, provider: &mut dyn RelationEndPointProvider) -> Result<()> {
        if let Some(error) = self.get_all_exceptions().into_iter().next() {
            return Err(error.clone());
        }
        trace!(target: "relata::command", commands = self.commands.len(), "Executing expanded command");
        self.begin()?;
        self.perform(provider)?;
        self.end()
    }
}

impl From<DataManagementCommand> for ExpandedCommand {
    fn from(command: DataManagementCommand) -> Self {
        let mut expanded = Self::new();
        expanded.push(command);
        expanded
    }
}

impl FromIterator<DataManagementCommand> for ExpandedCommand {
    fn from_iter<I: IntoIterator<Item = DataManagementCommand>>(iter: I) -> Self {
        let mut expanded = Self::new();
        for command in iter {
            expanded.push(command);
        }
        expanded
    }
}

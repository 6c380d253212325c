//! Error types for relation tracking
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - `ContractViolation`: the caller's code is wrong (wrong command for a
//!   relation's cardinality, a same-value command built for different values,
//!   an absent end point). Never caught internally and never retried.
//! - `OutOfSync`: the two sides of a bidirectional relation disagree. Must be
//!   fixed through the synchronization service, never automatically.
//! - `InvalidOperation`: double or missing registration, operations on a
//!   state that does not support them.
//! - `Load`: the external loader failed. The end point stays incomplete.

use crate::metadata::RelationEndPointId;
use thiserror::Error;

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the relation tracking layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Programming-contract violation detected by a constructor or factory
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A property and its opposite property disagree
    #[error(
        "{message} The property '{property}' of object '{object}' is out of sync with the \
         opposite property '{opposite_property}'. To make this change, synchronize the two \
         properties by calling the synchronization service on the '{property}' property."
    )]
    OutOfSync {
        /// Operation-specific description of what was attempted
        message: String,
        /// Object owning the out-of-sync property
        object: String,
        /// `Class.Property` of the out-of-sync end point
        property: String,
        /// `Class.Property` of the opposite end point
        opposite_property: String,
    },

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// No end point is registered under the given id
    #[error("Relation end point not found: {0}")]
    EndPointNotFound(RelationEndPointId),

    /// The external loader failed
    #[error("Load error for '{end_point}': {message}")]
    Load {
        /// End point whose data could not be loaded
        end_point: RelationEndPointId,
        /// Loader-provided description
        message: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Contract violation with the given message
    pub fn contract(message: impl Into<String>) -> Self {
        Error::ContractViolation(message.into())
    }

    /// Invalid operation with the given message
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }

    /// Out-of-sync error for the end point `id`
    pub fn out_of_sync(id: &RelationEndPointId, message: impl Into<String>) -> Self {
        Error::OutOfSync {
            message: message.into(),
            object: id.object_id().to_string(),
            property: id.property_display(),
            opposite_property: id.definition().opposite().display_name(),
        }
    }

    /// Load failure reported by a loader
    pub fn load(end_point: &RelationEndPointId, message: impl Into<String>) -> Self {
        Error::Load {
            end_point: end_point.clone(),
            message: message.into(),
        }
    }

    /// True for `OutOfSync`
    pub fn is_out_of_sync(&self) -> bool {
        matches!(self, Error::OutOfSync { .. })
    }

    /// True for `ContractViolation`
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::ContractViolation(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

//! Relation metadata consumed by the tracking layer
//!
//! The mapping layer describes every relation as a pair of end-point
//! definitions. This module holds the static shape of that description:
//! - Cardinality of each side (one or many)
//! - Real sides (hold the foreign key) vs virtual sides (derived by query)
//! - Anonymous sides (the missing half of a unidirectional relation)
//!
//! `RelationEndPointId` addresses one side of a relation for one object and
//! is the key of the end-point arena in `relata-tracking`.

use crate::error::{Error, Result};
use crate::types::{ClassId, ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Number of objects on one side of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one related object
    One,
    /// An ordered collection of related objects
    Many,
}

/// Shape of a relation as seen from its definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Bidirectional, one object on each side
    OneToOne,
    /// Bidirectional, a real scalar side and a virtual collection side
    OneToMany,
    /// Only the real side is navigable
    Unidirectional,
}

/// Static description of one side of a relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndPointDefinition {
    /// Class owning this side
    pub class_id: ClassId,
    /// Property name; `None` for the anonymous side of a unidirectional relation
    pub property_name: Option<String>,
    /// One or many related objects
    pub cardinality: Cardinality,
    /// Virtual sides have no physical key and are loaded by query
    pub is_virtual: bool,
    /// Whether a related object must be present at commit time
    pub is_mandatory: bool,
}

impl EndPointDefinition {
    /// A real (foreign-key) scalar side
    pub fn real(class_id: impl Into<ClassId>, property_name: &str) -> Self {
        Self {
            class_id: class_id.into(),
            property_name: Some(property_name.to_string()),
            cardinality: Cardinality::One,
            is_virtual: false,
            is_mandatory: false,
        }
    }

    /// A virtual scalar side (one-to-one, no foreign key)
    pub fn virtual_object(class_id: impl Into<ClassId>, property_name: &str) -> Self {
        Self {
            class_id: class_id.into(),
            property_name: Some(property_name.to_string()),
            cardinality: Cardinality::One,
            is_virtual: true,
            is_mandatory: false,
        }
    }

    /// A virtual collection side (one-to-many)
    pub fn collection(class_id: impl Into<ClassId>, property_name: &str) -> Self {
        Self {
            class_id: class_id.into(),
            property_name: Some(property_name.to_string()),
            cardinality: Cardinality::Many,
            is_virtual: true,
            is_mandatory: false,
        }
    }

    /// The non-navigable side of a unidirectional relation
    pub fn anonymous(class_id: impl Into<ClassId>) -> Self {
        Self {
            class_id: class_id.into(),
            property_name: None,
            cardinality: Cardinality::Many,
            is_virtual: true,
            is_mandatory: false,
        }
    }

    /// Mark the side as mandatory
    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    /// True for the anonymous side of a unidirectional relation
    pub fn is_anonymous(&self) -> bool {
        self.property_name.is_none()
    }
}

/// A relation: two end-point definitions under one id
#[derive(Debug, Serialize, Deserialize)]
pub struct RelationDefinition {
    id: String,
    end_points: [EndPointDefinition; 2],
}

impl RelationDefinition {
    /// Define a relation and return handles to both of its sides
    ///
    /// Exactly one side must be real. The real side is always scalar; an
    /// anonymous side is always virtual.
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` when the pair of definitions does
    /// not describe a supported relation.
    pub fn define(
        id: impl Into<String>,
        first: EndPointDefinition,
        second: EndPointDefinition,
    ) -> Result<(RelationEndPointDefinition, RelationEndPointDefinition)> {
        let id = id.into();
        for side in [&first, &second] {
            if side.is_anonymous() && !side.is_virtual {
                return Err(Error::contract(format!(
                    "Relation '{}': an anonymous end point must be virtual.",
                    id
                )));
            }
            if !side.is_virtual && side.cardinality == Cardinality::Many {
                return Err(Error::contract(format!(
                    "Relation '{}': a real end point cannot have cardinality 'Many'.",
                    id
                )));
            }
        }
        if first.is_virtual == second.is_virtual {
            return Err(Error::contract(format!(
                "Relation '{}' must have exactly one real end point.",
                id
            )));
        }

        let relation = Arc::new(RelationDefinition {
            id,
            end_points: [first, second],
        });
        Ok((
            RelationEndPointDefinition {
                relation: Arc::clone(&relation),
                side: 0,
            },
            RelationEndPointDefinition { relation, side: 1 },
        ))
    }

    /// Relation id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kind of the relation derived from its two sides
    pub fn kind(&self) -> RelationKind {
        let [a, b] = &self.end_points;
        if a.is_anonymous() || b.is_anonymous() {
            RelationKind::Unidirectional
        } else if a.cardinality == Cardinality::Many || b.cardinality == Cardinality::Many {
            RelationKind::OneToMany
        } else {
            RelationKind::OneToOne
        }
    }
}

/// Handle to one side of a `RelationDefinition`
///
/// Equality and hashing go by (relation id, side), so handles obtained from
/// the same `define` call are interchangeable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEndPointDefinition {
    relation: Arc<RelationDefinition>,
    side: usize,
}

impl RelationEndPointDefinition {
    /// The static description of this side
    pub fn definition(&self) -> &EndPointDefinition {
        &self.relation.end_points[self.side]
    }

    /// The other side of the same relation
    pub fn opposite(&self) -> RelationEndPointDefinition {
        RelationEndPointDefinition {
            relation: Arc::clone(&self.relation),
            side: 1 - self.side,
        }
    }

    /// The relation this side belongs to
    pub fn relation(&self) -> &RelationDefinition {
        &self.relation
    }

    /// Kind of the owning relation
    pub fn relation_kind(&self) -> RelationKind {
        self.relation.kind()
    }

    /// Class owning this side
    pub fn class_id(&self) -> &ClassId {
        &self.definition().class_id
    }

    /// Property name (None when anonymous)
    pub fn property_name(&self) -> Option<&str> {
        self.definition().property_name.as_deref()
    }

    /// Cardinality of this side
    pub fn cardinality(&self) -> Cardinality {
        self.definition().cardinality
    }

    /// True if this side has no physical key
    pub fn is_virtual(&self) -> bool {
        self.definition().is_virtual
    }

    /// True for the anonymous side of a unidirectional relation
    pub fn is_anonymous(&self) -> bool {
        self.definition().is_anonymous()
    }

    /// Real scalar side holding the foreign key
    pub fn is_real_object(&self) -> bool {
        !self.is_virtual()
    }

    /// Named virtual scalar side
    pub fn is_virtual_object(&self) -> bool {
        self.is_virtual() && !self.is_anonymous() && self.cardinality() == Cardinality::One
    }

    /// Named virtual collection side
    pub fn is_collection(&self) -> bool {
        self.is_virtual() && !self.is_anonymous() && self.cardinality() == Cardinality::Many
    }

    /// `Class.Property` name used in diagnostics
    pub fn display_name(&self) -> String {
        format!(
            "{}.{}",
            self.class_id(),
            self.property_name().unwrap_or("<anonymous>")
        )
    }
}

impl PartialEq for RelationEndPointDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.side == other.side && self.relation.id == other.relation.id
    }
}

impl Eq for RelationEndPointDefinition {}

impl Hash for RelationEndPointDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.relation.id.hash(state);
        self.side.hash(state);
    }
}

impl fmt::Display for RelationEndPointDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Address of one end point: (owning object, relation side)
///
/// An end point's id never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEndPointId {
    object_id: ObjectId,
    definition: RelationEndPointDefinition,
}

impl RelationEndPointId {
    /// Create an end-point id
    ///
    /// # Errors
    /// Returns `Error::ContractViolation` if the object's class does not own
    /// the definition, or if the definition is anonymous (anonymous sides
    /// have no addressable end points).
    pub fn new(object_id: ObjectId, definition: RelationEndPointDefinition) -> Result<Self> {
        if definition.is_anonymous() {
            return Err(Error::contract(format!(
                "Cannot address the anonymous end point of relation '{}'.",
                definition.relation().id()
            )));
        }
        if object_id.class_id() != definition.class_id() {
            return Err(Error::contract(format!(
                "Object '{}' does not belong to class '{}' declaring property '{}'.",
                object_id,
                definition.class_id(),
                definition.display_name()
            )));
        }
        Ok(Self {
            object_id,
            definition,
        })
    }

    /// Owning object
    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    /// Relation side
    pub fn definition(&self) -> &RelationEndPointDefinition {
        &self.definition
    }

    /// Id of the opposite end point owned by `related`
    ///
    /// Returns `Ok(None)` for unidirectional relations, whose opposite side
    /// is anonymous.
    pub fn opposite_for(&self, related: &ObjectId) -> Result<Option<RelationEndPointId>> {
        let opposite = self.definition.opposite();
        if opposite.is_anonymous() {
            return Ok(None);
        }
        RelationEndPointId::new(related.clone(), opposite).map(Some)
    }

    /// `Class.Property` of this end point
    pub fn property_display(&self) -> String {
        self.definition.display_name()
    }
}

impl fmt::Display for RelationEndPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object_id, self.definition)
    }
}

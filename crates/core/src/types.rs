//! Identity types for domain objects
//!
//! This module defines the foundational identity types:
//! - ClassId: Name of a mapped domain class
//! - ObjectKey: Primary key value of a domain object
//! - ObjectId: Class + key, the identity-map key for a domain object

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a mapped domain class
///
/// Cheap to clone; the name is shared behind an `Arc<str>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(Arc<str>);

impl ClassId {
    /// Create a class id from its name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The class name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Primary key value of a domain object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKey {
    /// Integer key (identity columns)
    Int(i64),
    /// Textual key
    Text(Arc<str>),
    /// UUID key
    Uuid(Uuid),
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKey::Int(v) => write!(f, "{}", v),
            ObjectKey::Text(v) => f.write_str(v),
            ObjectKey::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ObjectKey {
    fn from(v: i64) -> Self {
        ObjectKey::Int(v)
    }
}

impl From<i32> for ObjectKey {
    fn from(v: i32) -> Self {
        ObjectKey::Int(i64::from(v))
    }
}

impl From<&str> for ObjectKey {
    fn from(v: &str) -> Self {
        ObjectKey::Text(Arc::from(v))
    }
}

impl From<String> for ObjectKey {
    fn from(v: String) -> Self {
        ObjectKey::Text(Arc::from(v))
    }
}

impl From<Uuid> for ObjectKey {
    fn from(v: Uuid) -> Self {
        ObjectKey::Uuid(v)
    }
}

/// Identity of a domain object: (class, key)
///
/// ObjectIds are immutable and compare by value. They are the key of every
/// identity-map style lookup in the tracking layer, and they double as the
/// lightweight reference to a related object: the class id is all the type
/// information needed to navigate to the object's end points.
///
/// # Examples
///
/// ```
/// use relata_core::{ClassId, ObjectId};
///
/// let order = ObjectId::new("Order", 1);
/// assert_eq!(order.class_id(), &ClassId::new("Order"));
/// assert_eq!(order.to_string(), "Order|1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    class_id: ClassId,
    key: ObjectKey,
}

impl ObjectId {
    /// Create an ObjectId from a class name and key value
    pub fn new(class_id: impl Into<ClassId>, key: impl Into<ObjectKey>) -> Self {
        Self {
            class_id: class_id.into(),
            key: key.into(),
        }
    }

    /// Create an ObjectId with a fresh random UUID key (new objects)
    pub fn new_random(class_id: impl Into<ClassId>) -> Self {
        Self::new(class_id, Uuid::new_v4())
    }

    /// Class of the identified object
    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    /// Key value of the identified object
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.class_id, self.key)
    }
}

/// Formats an optional related object the way error messages show it
pub fn display_related(object: Option<&ObjectId>) -> String {
    match object {
        Some(id) => id.to_string(),
        None => "<null>".to_string(),
    }
}

//! # Relata
//!
//! Relation end-point tracking for object transactions.
//!
//! Relata keeps both sides of a bidirectional relation consistent while a
//! transaction edits it. Foreign-key sides ("real" end points) are always
//! known; the other sides ("virtual" end points) are loaded on first access.
//!
//! ## Quick Start
//!
//! ```ignore
//! use relata::{RelationEndPointManager, TrackingConfig};
//!
//! let mut manager = RelationEndPointManager::new(TrackingConfig::default(), loader, sink);
//! manager.register_real_object_end_point(order_customer, Some(customer))?;
//! manager.set_related_object(&order_customer, Some(other_customer))?;
//! assert_eq!(manager.get_related_objects(&other_customer_orders)?, vec![order]);
//! ```
//!
//! ## Crates
//!
//! - [`relata_core`]: ids, relation metadata, errors, events and configuration
//! - [`relata_tracking`]: end points, commands, the manager and synchronization

pub use relata_core::*;
pub use relata_tracking::*;

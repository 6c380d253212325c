//! End-Point Test Suite
//!
//! Exercises relation end points through the `RelationEndPointManager`, the
//! way a transaction drives them.
//!
//! ## Modules
//!
//! - `scenarios`: Order/Customer/OrderTicket walkthroughs
//! - `symmetry`: both sides agree after every kind of change
//! - `loading`: lazy loading, replay of buffered end points, configuration
//! - `lifecycle`: commit, rollback and subordinate transactions
//! - `sync`: out-of-sync detection and repair
//! - `properties`: property-based checks over random edit sequences
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test end_points
//! cargo test --test end_points symmetry::
//! ```

#[path = "../common/mod.rs"]
mod common;

mod lifecycle;
mod loading;
mod properties;
mod scenarios;
mod symmetry;
mod sync;

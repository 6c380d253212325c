//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};

pub use relata::{
    ChangeDetection, DataManagementCommand, Error, LoadedEndPointData, ObjectId,
    RecordedEvent, RecordingEventSink, RelationEndPoint, RelationEndPointId,
    RelationEndPointManager, RelationEndPointProvider, TrackingConfig,
};
pub use relata_tracking::testing::{InMemoryEndPointLoader, OrderModel};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output of the library to the test writer
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Fixture - order model plus one transaction's manager
// ============================================================================

/// Order model together with the manager of one transaction
pub struct Fixture {
    pub model: OrderModel,
    pub manager: RelationEndPointManager,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(TrackingConfig::default())
    }

    pub fn with_config(config: TrackingConfig) -> Self {
        init_tracing();
        let model = OrderModel::new();
        let manager = model.manager_with_config(config);
        Self { model, manager }
    }

    pub fn loader(&self) -> Arc<InMemoryEndPointLoader> {
        self.model.loader()
    }

    pub fn recorder(&self) -> Arc<RecordingEventSink> {
        self.model.recorder()
    }

    /// Simulate loading customer `customer` and its `orders` from the store
    ///
    /// The collection data is served by the loader; each order's foreign key
    /// is registered as a real end point.
    pub fn load_customer(&mut self, customer: i64, orders: &[i64]) {
        let model = &self.model;
        model.loader().set_collection(
            model.customer_orders_of(customer),
            orders.iter().map(|&o| model.order(o)).collect(),
        );
        for &order in orders {
            self.manager
                .register_real_object_end_point(
                    model.order_customer_of(order),
                    Some(model.customer(customer)),
                )
                .unwrap();
        }
    }

    /// Simulate loading ticket `ticket` whose foreign key is `order`
    pub fn load_ticket(&mut self, ticket: i64, order: Option<i64>) {
        let model = &self.model;
        if let Some(order) = order {
            model
                .loader()
                .set_object(model.order_ticket_of(order), Some(model.ticket(ticket)));
        }
        self.manager
            .register_real_object_end_point(
                model.ticket_order_of(ticket),
                order.map(|o| model.order(o)),
            )
            .unwrap();
    }

    /// Register end points of newly created orders, customers and tickets
    pub fn create_objects(&mut self, orders: &[i64], customers: &[i64], tickets: &[i64]) {
        let model = &self.model;
        for &order in orders {
            self.manager
                .register_end_points_for_new_object(&model.order(order), &model.order_definitions())
                .unwrap();
        }
        for &customer in customers {
            self.manager
                .register_end_points_for_new_object(
                    &model.customer(customer),
                    &model.customer_definitions(),
                )
                .unwrap();
        }
        for &ticket in tickets {
            self.manager
                .register_end_points_for_new_object(
                    &model.ticket(ticket),
                    &model.ticket_definitions(),
                )
                .unwrap();
        }
    }

    pub fn customer_of(&mut self, order: i64) -> Option<ObjectId> {
        let id = self.model.order_customer_of(order);
        self.manager.get_related_object(&id).unwrap()
    }

    pub fn orders_of(&mut self, customer: i64) -> Vec<ObjectId> {
        let id = self.model.customer_orders_of(customer);
        self.manager.get_related_objects(&id).unwrap()
    }

    pub fn order_of_ticket(&mut self, ticket: i64) -> Option<ObjectId> {
        let id = self.model.ticket_order_of(ticket);
        self.manager.get_related_object(&id).unwrap()
    }

    pub fn ticket_of(&mut self, order: i64) -> Option<ObjectId> {
        let id = self.model.order_ticket_of(order);
        self.manager.get_related_object(&id).unwrap()
    }

    /// Assert that both sides of every Order/Customer relation agree
    pub fn assert_customers_consistent(&mut self, orders: &[i64], customers: &[i64]) {
        for &order in orders {
            let customer = self.customer_of(order);
            for &candidate in customers {
                let contains = self.orders_of(candidate).contains(&self.model.order(order));
                assert_eq!(
                    contains,
                    customer == Some(self.model.customer(candidate)),
                    "Order|{} and Customer|{} disagree",
                    order,
                    candidate
                );
            }
        }
    }

    /// Assert that both sides of every OrderTicket/Order relation agree
    pub fn assert_tickets_consistent(&mut self, orders: &[i64], tickets: &[i64]) {
        for &ticket in tickets {
            if let Some(order) = self.order_of_ticket(ticket) {
                let order_key = orders
                    .iter()
                    .copied()
                    .find(|&o| self.model.order(o) == order)
                    .expect("ticket points to a known order");
                assert_eq!(self.ticket_of(order_key), Some(self.model.ticket(ticket)));
            }
        }
        for &order in orders {
            if let Some(ticket) = self.ticket_of(order) {
                let ticket_key = tickets
                    .iter()
                    .copied()
                    .find(|&t| self.model.ticket(t) == ticket)
                    .expect("order points to a known ticket");
                assert_eq!(self.order_of_ticket(ticket_key), Some(self.model.order(order)));
            }
        }
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

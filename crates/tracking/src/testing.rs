//! Test fixtures
//!
//! `OrderModel` defines a small domain with one relation of each shape:
//!
//! | Relation            | Real side          | Virtual side             |
//! |---------------------|--------------------|--------------------------|
//! | Order/Customer      | `Order.Customer`   | `Customer.Orders` (many) |
//! | OrderTicket/Order   | `OrderTicket.Order`| `Order.OrderTicket` (one)|
//! | Location/Client     | `Location.Client`  | anonymous                |
//!
//! `InMemoryEndPointLoader` serves virtual end-point data from maps and
//! counts loads.

use crate::data::{DefaultDataManagerFactory, EndPointDataManagerFactory};
use crate::load_state::{EndPointLoader, IncompleteLoadState, LoadedEndPointData};
use crate::manager::RelationEndPointManager;
use parking_lot::Mutex;
use relata_core::{
    EndPointDefinition, Error, ObjectId, RecordingEventSink, RelationDefinition,
    RelationEndPointDefinition, RelationEndPointId, Result, TrackingConfig, TransactionEventSink,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Loader backed by in-memory maps
///
/// End points without configured data load as empty: `None` for a virtual
/// object end point, no items for a collection.
#[derive(Debug, Default)]
pub struct InMemoryEndPointLoader {
    data: Mutex<FxHashMap<RelationEndPointId, LoadedEndPointData>>,
    failures: Mutex<FxHashMap<RelationEndPointId, String>>,
    load_counts: Mutex<FxHashMap<RelationEndPointId, usize>>,
}

impl InMemoryEndPointLoader {
    /// Empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `item` for the virtual object end point `id`
    pub fn set_object(&self, id: RelationEndPointId, item: Option<ObjectId>) {
        self.failures.lock().remove(&id);
        self.data.lock().insert(id, LoadedEndPointData::Object(item));
    }

    /// Serve `items` for the collection end point `id`
    pub fn set_collection(&self, id: RelationEndPointId, items: Vec<ObjectId>) {
        self.failures.lock().remove(&id);
        self.data
            .lock()
            .insert(id, LoadedEndPointData::Collection(items));
    }

    /// Fail every load of `id` until data is set again
    pub fn fail(&self, id: RelationEndPointId, message: impl Into<String>) {
        self.failures.lock().insert(id, message.into());
    }

    /// Number of load attempts for `id`
    pub fn load_count(&self, id: &RelationEndPointId) -> usize {
        self.load_counts.lock().get(id).copied().unwrap_or(0)
    }

    /// Number of load attempts over all end points
    pub fn total_load_count(&self) -> usize {
        self.load_counts.lock().values().sum()
    }
}

impl EndPointLoader for InMemoryEndPointLoader {
    fn load_end_point_data(&self, end_point_id: &RelationEndPointId) -> Result<LoadedEndPointData> {
        *self
            .load_counts
            .lock()
            .entry(end_point_id.clone())
            .or_insert(0) += 1;

        if let Some(message) = self.failures.lock().get(end_point_id) {
            return Err(Error::load(end_point_id, message.clone()));
        }
        if let Some(data) = self.data.lock().get(end_point_id) {
            return Ok(data.clone());
        }
        if end_point_id.definition().is_collection() {
            Ok(LoadedEndPointData::Collection(Vec::new()))
        } else {
            Ok(LoadedEndPointData::Object(None))
        }
    }
}

/// Order domain fixture
#[derive(Debug, Clone)]
pub struct OrderModel {
    order_customer: RelationEndPointDefinition,
    customer_orders: RelationEndPointDefinition,
    ticket_order: RelationEndPointDefinition,
    order_ticket: RelationEndPointDefinition,
    location_client: RelationEndPointDefinition,
    loader: Arc<InMemoryEndPointLoader>,
    recorder: Arc<RecordingEventSink>,
}

impl Default for OrderModel {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderModel {
    /// Define the relations with a fresh loader and event recorder
    pub fn new() -> Self {
        let (order_customer, customer_orders) = RelationDefinition::define(
            "Order:Customer",
            EndPointDefinition::real("Order", "Customer"),
            EndPointDefinition::collection("Customer", "Orders"),
        )
        .expect("Order:Customer is a valid relation");
        let (ticket_order, order_ticket) = RelationDefinition::define(
            "OrderTicket:Order",
            EndPointDefinition::real("OrderTicket", "Order"),
            EndPointDefinition::virtual_object("Order", "OrderTicket"),
        )
        .expect("OrderTicket:Order is a valid relation");
        let (location_client, _) = RelationDefinition::define(
            "Location:Client",
            EndPointDefinition::real("Location", "Client"),
            EndPointDefinition::anonymous("Client"),
        )
        .expect("Location:Client is a valid relation");

        Self {
            order_customer,
            customer_orders,
            ticket_order,
            order_ticket,
            location_client,
            loader: Arc::new(InMemoryEndPointLoader::new()),
            recorder: Arc::new(RecordingEventSink::new()),
        }
    }

    pub fn order(&self, key: i64) -> ObjectId {
        ObjectId::new("Order", key)
    }

    pub fn customer(&self, key: i64) -> ObjectId {
        ObjectId::new("Customer", key)
    }

    pub fn ticket(&self, key: i64) -> ObjectId {
        ObjectId::new("OrderTicket", key)
    }

    pub fn location(&self, key: i64) -> ObjectId {
        ObjectId::new("Location", key)
    }

    pub fn client(&self, key: i64) -> ObjectId {
        ObjectId::new("Client", key)
    }

    /// `Order.Customer` of order `key`
    pub fn order_customer_of(&self, key: i64) -> RelationEndPointId {
        end_point(self.order(key), &self.order_customer)
    }

    /// `Customer.Orders` of customer `key`
    pub fn customer_orders_of(&self, key: i64) -> RelationEndPointId {
        end_point(self.customer(key), &self.customer_orders)
    }

    /// `OrderTicket.Order` of ticket `key`
    pub fn ticket_order_of(&self, key: i64) -> RelationEndPointId {
        end_point(self.ticket(key), &self.ticket_order)
    }

    /// `Order.OrderTicket` of order `key`
    pub fn order_ticket_of(&self, key: i64) -> RelationEndPointId {
        end_point(self.order(key), &self.order_ticket)
    }

    /// `Location.Client` of location `key`
    pub fn location_client_of(&self, key: i64) -> RelationEndPointId {
        end_point(self.location(key), &self.location_client)
    }

    pub fn order_definitions(&self) -> Vec<RelationEndPointDefinition> {
        vec![self.order_customer.clone(), self.order_ticket.clone()]
    }

    pub fn customer_definitions(&self) -> Vec<RelationEndPointDefinition> {
        vec![self.customer_orders.clone()]
    }

    pub fn ticket_definitions(&self) -> Vec<RelationEndPointDefinition> {
        vec![self.ticket_order.clone()]
    }

    pub fn location_definitions(&self) -> Vec<RelationEndPointDefinition> {
        vec![self.location_client.clone()]
    }

    pub fn loader(&self) -> Arc<InMemoryEndPointLoader> {
        Arc::clone(&self.loader)
    }

    /// Recorder behind `event_sink`
    pub fn recorder(&self) -> Arc<RecordingEventSink> {
        Arc::clone(&self.recorder)
    }

    pub fn event_sink(&self) -> Arc<dyn TransactionEventSink> {
        self.recorder.clone()
    }

    pub fn data_manager_factory(&self) -> Arc<dyn EndPointDataManagerFactory> {
        Arc::new(DefaultDataManagerFactory::default())
    }

    pub fn incomplete_state(&self) -> IncompleteLoadState {
        IncompleteLoadState::new(self.loader(), self.data_manager_factory())
    }

    /// Manager with the default configuration
    pub fn manager(&self) -> RelationEndPointManager {
        self.manager_with_config(TrackingConfig::default())
    }

    pub fn manager_with_config(&self, config: TrackingConfig) -> RelationEndPointManager {
        RelationEndPointManager::new(config, self.loader(), self.event_sink())
    }
}

fn end_point(object_id: ObjectId, definition: &RelationEndPointDefinition) -> RelationEndPointId {
    RelationEndPointId::new(object_id, definition.clone())
        .expect("fixture end point matches its definition")
}

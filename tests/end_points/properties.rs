//! Property-based checks over random edit sequences
//!
//! The fixture starts from a consistent store: customers 1 and 2 with orders
//! 1-3 and tickets 1-2 loaded, order 4 and ticket 3 newly created. Edits that
//! violate a contract are rejected before anything runs, so every sequence
//! must leave both sides of each relation in agreement.

use crate::common::*;
use proptest::prelude::*;

const ORDERS: [i64; 4] = [1, 2, 3, 4];
const CUSTOMERS: [i64; 2] = [1, 2];
const TICKETS: [i64; 3] = [1, 2, 3];

#[derive(Debug, Clone)]
enum Edit {
    SetCustomer { order: i64, customer: Option<i64> },
    AddOrder { customer: i64, order: i64 },
    RemoveOrder { customer: i64, order: i64 },
    ReplaceOrder { customer: i64, index: usize, order: i64 },
    SetOrders { customer: i64, orders: Vec<i64> },
    SetTicketOrder { ticket: i64, order: Option<i64> },
    SetOrderTicket { order: i64, ticket: Option<i64> },
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    let order = 1i64..=4;
    let customer = 1i64..=2;
    let ticket = 1i64..=3;
    prop_oneof![
        (order.clone(), prop::option::of(customer.clone()))
            .prop_map(|(order, customer)| Edit::SetCustomer { order, customer }),
        (customer.clone(), order.clone())
            .prop_map(|(customer, order)| Edit::AddOrder { customer, order }),
        (customer.clone(), order.clone())
            .prop_map(|(customer, order)| Edit::RemoveOrder { customer, order }),
        (customer.clone(), 0usize..3, order.clone())
            .prop_map(|(customer, index, order)| Edit::ReplaceOrder { customer, index, order }),
        (customer, prop::sample::subsequence(ORDERS.to_vec(), 0..=4).prop_shuffle())
            .prop_map(|(customer, orders)| Edit::SetOrders { customer, orders }),
        (ticket.clone(), prop::option::of(order.clone()))
            .prop_map(|(ticket, order)| Edit::SetTicketOrder { ticket, order }),
        (order, prop::option::of(ticket))
            .prop_map(|(order, ticket)| Edit::SetOrderTicket { order, ticket }),
    ]
}

fn loaded_fixture() -> Fixture {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_customer(2, &[3]);
    fx.load_ticket(1, Some(1));
    fx.load_ticket(2, Some(2));
    fx.create_objects(&[4], &[], &[3]);
    fx
}

fn apply(fx: &mut Fixture, edit: &Edit) -> Result<(), Error> {
    let m = &fx.model;
    let manager = &mut fx.manager;
    match edit {
        Edit::SetCustomer { order, customer } => manager.set_related_object(
            &m.order_customer_of(*order),
            customer.map(|c| m.customer(c)),
        ),
        Edit::AddOrder { customer, order } => {
            manager.add_related_object(&m.customer_orders_of(*customer), m.order(*order))
        }
        Edit::RemoveOrder { customer, order } => {
            manager.remove_related_object(&m.customer_orders_of(*customer), m.order(*order))
        }
        Edit::ReplaceOrder {
            customer,
            index,
            order,
        } => manager.replace_related_object(
            &m.customer_orders_of(*customer),
            *index,
            m.order(*order),
        ),
        Edit::SetOrders { customer, orders } => manager.set_related_objects(
            &m.customer_orders_of(*customer),
            orders.iter().map(|&o| m.order(o)).collect(),
        ),
        Edit::SetTicketOrder { ticket, order } => manager.set_related_object(
            &m.ticket_order_of(*ticket),
            order.map(|o| m.order(o)),
        ),
        Edit::SetOrderTicket { order, ticket } => manager.set_related_object(
            &m.order_ticket_of(*order),
            ticket.map(|t| m.ticket(t)),
        ),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    customers: Vec<Option<ObjectId>>,
    orders: Vec<Vec<ObjectId>>,
    ticket_orders: Vec<Option<ObjectId>>,
    order_tickets: Vec<Option<ObjectId>>,
}

fn snapshot(fx: &mut Fixture) -> Snapshot {
    Snapshot {
        customers: ORDERS.iter().map(|&o| fx.customer_of(o)).collect(),
        orders: CUSTOMERS.iter().map(|&c| fx.orders_of(c)).collect(),
        ticket_orders: TICKETS.iter().map(|&t| fx.order_of_ticket(t)).collect(),
        order_tickets: ORDERS.iter().map(|&o| fx.ticket_of(o)).collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_relations_stay_symmetric(edits in prop::collection::vec(arb_edit(), 1..12)) {
        let mut fx = loaded_fixture();
        for edit in &edits {
            let _ = apply(&mut fx, edit);
        }
        fx.assert_customers_consistent(&ORDERS, &CUSTOMERS);
        fx.assert_tickets_consistent(&ORDERS, &TICKETS);
    }

    #[test]
    fn prop_rollback_restores_loaded_state(edits in prop::collection::vec(arb_edit(), 1..12)) {
        let mut fx = loaded_fixture();
        let before = snapshot(&mut fx);
        for edit in &edits {
            let _ = apply(&mut fx, edit);
        }
        fx.manager.rollback_all_end_points();

        prop_assert!(!fx.manager.has_changed());
        prop_assert_eq!(snapshot(&mut fx), before);
    }

    #[test]
    fn prop_commit_then_rollback_keeps_data(edits in prop::collection::vec(arb_edit(), 1..12)) {
        let mut fx = loaded_fixture();
        for edit in &edits {
            let _ = apply(&mut fx, edit);
        }
        let edited = snapshot(&mut fx);
        fx.manager.commit_all_end_points();
        prop_assert!(!fx.manager.has_changed());
        fx.manager.rollback_all_end_points();

        prop_assert!(!fx.manager.has_changed());
        prop_assert_eq!(snapshot(&mut fx), edited);
    }

    #[test]
    fn prop_same_value_set_is_silent(edits in prop::collection::vec(arb_edit(), 0..8)) {
        let mut fx = loaded_fixture();
        for edit in &edits {
            let _ = apply(&mut fx, edit);
        }
        let changed = fx.manager.changed_end_point_ids().len();
        fx.recorder().clear();

        for order in ORDERS {
            let customer = fx.customer_of(order);
            fx.manager
                .set_related_object(&fx.model.order_customer_of(order), customer)
                .unwrap();
            let ticket = fx.ticket_of(order);
            fx.manager
                .set_related_object(&fx.model.order_ticket_of(order), ticket)
                .unwrap();
        }

        prop_assert!(fx.recorder().is_empty());
        prop_assert_eq!(fx.manager.changed_end_point_ids().len(), changed);
    }
}

//! Both sides of a relation agree after every kind of change

use crate::common::*;

fn changing(end_point: RelationEndPointId, old: Option<ObjectId>, new: Option<ObjectId>) -> RecordedEvent {
    RecordedEvent::RelationChanging {
        end_point,
        old_related: old,
        new_related: new,
    }
}

fn changed(end_point: RelationEndPointId, old: Option<ObjectId>, new: Option<ObjectId>) -> RecordedEvent {
    RecordedEvent::RelationChanged {
        end_point,
        old_related: old,
        new_related: new,
    }
}

// ============================================================================
// One-to-many
// ============================================================================

#[test]
fn set_real_side_moves_order_between_customers() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_customer(2, &[3]);

    fx.manager
        .set_related_object(&fx.model.order_customer_of(1), Some(fx.model.customer(2)))
        .unwrap();

    assert_eq!(fx.orders_of(1), vec![fx.model.order(2)]);
    assert_eq!(fx.orders_of(2), vec![fx.model.order(3), fx.model.order(1)]);
    fx.assert_customers_consistent(&[1, 2, 3], &[1, 2]);

    let m = &fx.model;
    assert_eq!(
        fx.recorder().relation_events(),
        vec![
            changing(m.customer_orders_of(2), None, Some(m.order(1))),
            changing(m.order_customer_of(1), Some(m.customer(1)), Some(m.customer(2))),
            changing(m.customer_orders_of(1), Some(m.order(1)), None),
            changed(m.customer_orders_of(2), None, Some(m.order(1))),
            changed(m.order_customer_of(1), Some(m.customer(1)), Some(m.customer(2))),
            changed(m.customer_orders_of(1), Some(m.order(1)), None),
        ]
    );
}

#[test]
fn clear_real_side_removes_from_collection() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);

    fx.manager
        .set_related_object(&fx.model.order_customer_of(2), None)
        .unwrap();

    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
    assert_eq!(fx.customer_of(2), None);
    fx.assert_customers_consistent(&[1, 2], &[1]);
}

#[test]
fn insert_steals_order_from_previous_customer() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);
    fx.load_customer(2, &[2, 3]);

    fx.manager
        .insert_related_object(&fx.model.customer_orders_of(1), 0, fx.model.order(3))
        .unwrap();

    assert_eq!(fx.orders_of(1), vec![fx.model.order(3), fx.model.order(1)]);
    assert_eq!(fx.orders_of(2), vec![fx.model.order(2)]);
    assert_eq!(fx.customer_of(3), Some(fx.model.customer(1)));
    fx.assert_customers_consistent(&[1, 2, 3], &[1, 2]);
}

#[test]
fn add_new_order_to_loaded_customer() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);
    fx.create_objects(&[5], &[], &[]);

    fx.manager
        .add_related_object(&fx.model.customer_orders_of(1), fx.model.order(5))
        .unwrap();

    assert_eq!(fx.orders_of(1), vec![fx.model.order(1), fx.model.order(5)]);
    assert_eq!(fx.customer_of(5), Some(fx.model.customer(1)));
}

#[test]
fn remove_clears_real_side() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);

    fx.manager
        .remove_related_object(&fx.model.customer_orders_of(1), fx.model.order(1))
        .unwrap();

    assert_eq!(fx.orders_of(1), vec![fx.model.order(2)]);
    assert_eq!(fx.customer_of(1), None);
    fx.assert_customers_consistent(&[1, 2], &[1]);
}

#[test]
fn remove_missing_item_does_nothing() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);
    fx.load_customer(2, &[2]);

    fx.manager
        .remove_related_object(&fx.model.customer_orders_of(1), fx.model.order(2))
        .unwrap();

    assert_eq!(fx.customer_of(2), Some(fx.model.customer(2)));
    assert!(fx.recorder().is_empty());
    assert!(!fx.manager.has_changed());
}

#[test]
fn replace_swaps_both_real_sides() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_customer(2, &[3]);

    fx.manager
        .replace_related_object(&fx.model.customer_orders_of(1), 0, fx.model.order(3))
        .unwrap();

    assert_eq!(fx.orders_of(1), vec![fx.model.order(3), fx.model.order(2)]);
    assert_eq!(fx.customer_of(1), None);
    assert_eq!(fx.customer_of(3), Some(fx.model.customer(1)));
    assert!(fx.orders_of(2).is_empty());
    fx.assert_customers_consistent(&[1, 2, 3], &[1, 2]);
}

#[test]
fn replace_with_same_item_only_touches() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);

    fx.manager
        .replace_related_object(&fx.model.customer_orders_of(1), 0, fx.model.order(1))
        .unwrap();

    assert!(fx.recorder().is_empty());
    assert!(!fx.manager.has_changed());
    assert!(fx.manager.has_been_touched(&fx.model.order_customer_of(1)));
}

#[test]
fn insert_duplicate_is_contract_violation() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);

    let err = fx
        .manager
        .add_related_object(&fx.model.customer_orders_of(1), fx.model.order(1))
        .unwrap_err();

    assert!(err.is_contract_violation());
    assert!(fx.recorder().is_empty());
}

// ============================================================================
// One-to-one
// ============================================================================

#[test]
fn set_real_side_of_one_to_one() {
    let mut fx = Fixture::new();
    fx.load_ticket(1, Some(1));
    fx.load_ticket(2, Some(2));

    // Ticket 2 moves to order 1, displacing ticket 1 and leaving order 2 empty
    fx.manager
        .set_related_object(&fx.model.ticket_order_of(2), Some(fx.model.order(1)))
        .unwrap();

    assert_eq!(fx.order_of_ticket(2), Some(fx.model.order(1)));
    assert_eq!(fx.ticket_of(1), Some(fx.model.ticket(2)));
    assert_eq!(fx.order_of_ticket(1), None);
    assert_eq!(fx.ticket_of(2), None);
    fx.assert_tickets_consistent(&[1, 2], &[1, 2]);
}

#[test]
fn set_virtual_side_of_one_to_one() {
    let mut fx = Fixture::new();
    fx.load_ticket(1, Some(1));
    fx.load_ticket(2, Some(2));

    fx.manager
        .set_related_object(&fx.model.order_ticket_of(1), Some(fx.model.ticket(2)))
        .unwrap();

    assert_eq!(fx.ticket_of(1), Some(fx.model.ticket(2)));
    assert_eq!(fx.order_of_ticket(2), Some(fx.model.order(1)));
    assert_eq!(fx.order_of_ticket(1), None);
    assert_eq!(fx.ticket_of(2), None);
    fx.assert_tickets_consistent(&[1, 2], &[1, 2]);
}

#[test]
fn clear_virtual_side_of_one_to_one() {
    let mut fx = Fixture::new();
    fx.load_ticket(1, Some(1));

    fx.manager
        .set_related_object(&fx.model.order_ticket_of(1), None)
        .unwrap();

    assert_eq!(fx.ticket_of(1), None);
    assert_eq!(fx.order_of_ticket(1), None);
}

// ============================================================================
// Unidirectional
// ============================================================================

#[test]
fn unidirectional_set_touches_only_real_side() {
    let mut fx = Fixture::new();
    let location_client = fx.model.location_client_of(1);
    fx.manager
        .register_real_object_end_point(location_client.clone(), Some(fx.model.client(1)))
        .unwrap();

    fx.manager
        .set_related_object(&location_client, Some(fx.model.client(2)))
        .unwrap();

    assert_eq!(
        fx.manager.get_related_object(&location_client).unwrap(),
        Some(fx.model.client(2))
    );
    assert_eq!(fx.manager.len(), 1);
    assert_eq!(fx.recorder().relation_events().len(), 2);
}

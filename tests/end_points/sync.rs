//! Out-of-sync detection and repair

use crate::common::*;

/// Customer 1's loaded orders omit order 1, whose foreign key names customer 1
fn fixture_with_unsynchronized_real_end_point() -> Fixture {
    let mut fx = Fixture::new();
    fx.loader()
        .set_collection(fx.model.customer_orders_of(1), vec![]);
    fx.manager
        .register_real_object_end_point(fx.model.order_customer_of(1), Some(fx.model.customer(1)))
        .unwrap();
    fx.load_customer(2, &[]);
    fx
}

#[test]
fn unsynchronized_real_end_point_refuses_changes() {
    let mut fx = fixture_with_unsynchronized_real_end_point();
    assert!(!fx.manager.is_synchronized(&fx.model.order_customer_of(1)).unwrap());

    let err = fx
        .manager
        .set_related_object(&fx.model.order_customer_of(1), Some(fx.model.customer(2)))
        .unwrap_err();
    assert!(err.is_out_of_sync());

    let err = fx
        .manager
        .add_related_object(&fx.model.customer_orders_of(1), fx.model.order(1))
        .unwrap_err();
    assert!(err.is_out_of_sync());
    assert!(fx.recorder().is_empty());
}

#[test]
fn synchronize_real_end_point_then_change() {
    let mut fx = fixture_with_unsynchronized_real_end_point();

    fx.manager.synchronize(&fx.model.order_customer_of(1)).unwrap();

    assert!(fx.manager.is_synchronized(&fx.model.order_customer_of(1)).unwrap());
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
    assert!(!fx.manager.has_changed());

    fx.manager
        .set_related_object(&fx.model.order_customer_of(1), Some(fx.model.customer(2)))
        .unwrap();
    assert!(fx.orders_of(1).is_empty());
    assert_eq!(fx.orders_of(2), vec![fx.model.order(1)]);
}

#[test]
fn collection_item_without_end_point_refuses_removal() {
    let mut fx = Fixture::new();
    let orders = fx.model.customer_orders_of(1);
    fx.loader()
        .set_collection(orders.clone(), vec![fx.model.order(1), fx.model.order(5)]);
    fx.manager
        .register_real_object_end_point(fx.model.order_customer_of(1), Some(fx.model.customer(1)))
        .unwrap();

    assert!(!fx.manager.is_synchronized(&orders).unwrap());
    let err = fx
        .manager
        .remove_related_object(&orders, fx.model.order(5))
        .unwrap_err();
    assert!(err.is_out_of_sync());

    let composite = fx
        .manager
        .create_object_delete_command(&fx.model.customer(1), &fx.model.customer_definitions());
    assert_eq!(composite.get_all_exceptions().len(), 1);
    assert!(composite.get_all_exceptions()[0].is_out_of_sync());
}

#[test]
fn synchronize_collection_drops_items_without_end_point() {
    let mut fx = Fixture::new();
    let orders = fx.model.customer_orders_of(1);
    fx.loader()
        .set_collection(orders.clone(), vec![fx.model.order(1), fx.model.order(5)]);
    fx.manager
        .register_real_object_end_point(fx.model.order_customer_of(1), Some(fx.model.customer(1)))
        .unwrap();

    fx.manager.synchronize(&orders).unwrap();

    assert!(fx.manager.is_synchronized(&orders).unwrap());
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
    fx.manager
        .delete_object(&fx.model.customer(1), &fx.model.customer_definitions())
        .unwrap();
    assert!(fx.orders_of(1).is_empty());
    assert_eq!(fx.customer_of(1), None);
}

#[test]
fn synchronize_virtual_object_drops_item_without_end_point() {
    let mut fx = Fixture::new();
    let order_ticket = fx.model.order_ticket_of(1);
    fx.loader()
        .set_object(order_ticket.clone(), Some(fx.model.ticket(9)));

    assert!(!fx.manager.is_synchronized(&order_ticket).unwrap());
    fx.manager.synchronize(&order_ticket).unwrap();

    assert!(fx.manager.is_synchronized(&order_ticket).unwrap());
    assert_eq!(fx.ticket_of(1), None);
}

#[test]
fn synchronize_fails_when_virtual_side_refers_to_another_object() {
    let mut fx = Fixture::new();
    fx.load_ticket(1, Some(1));
    assert_eq!(fx.ticket_of(1), Some(fx.model.ticket(1)));

    // Ticket 2 also claims order 1
    fx.manager
        .register_real_object_end_point(fx.model.ticket_order_of(2), Some(fx.model.order(1)))
        .unwrap();
    assert!(!fx.manager.is_synchronized(&fx.model.ticket_order_of(2)).unwrap());

    let err = fx
        .manager
        .synchronize(&fx.model.ticket_order_of(2))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));
}

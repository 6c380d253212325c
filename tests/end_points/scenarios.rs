//! Walkthroughs of the Order domain

use crate::common::*;

#[test]
fn same_value_set_raises_no_notifications() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    let order_customer = fx.model.order_customer_of(1);
    let customer = fx.model.customer(1);

    fx.manager
        .set_related_object(&order_customer, Some(customer))
        .unwrap();

    assert!(fx.recorder().is_empty());
    assert!(!fx.manager.has_changed());
    assert!(fx.manager.has_been_touched(&order_customer));
    assert!(fx.manager.has_been_touched(&fx.model.customer_orders_of(1)));
}

#[test]
fn virtual_same_value_set_raises_no_notifications() {
    let mut fx = Fixture::new();
    fx.load_ticket(7, Some(1));
    let order_ticket = fx.model.order_ticket_of(1);
    let ticket = fx.model.ticket(7);

    fx.manager.set_related_object(&order_ticket, Some(ticket)).unwrap();

    assert!(fx.recorder().is_empty());
    assert!(!fx.manager.has_changed());
    assert!(fx.manager.has_been_touched(&fx.model.ticket_order_of(7)));
}

#[test]
fn order_ticket_mark_data_complete() {
    let mut fx = Fixture::new();
    let order_ticket = fx.model.order_ticket_of(1);
    fx.manager
        .register_real_object_end_point(fx.model.ticket_order_of(7), Some(fx.model.order(1)))
        .unwrap();
    assert!(!fx
        .manager
        .get_end_point_without_loading(&order_ticket)
        .unwrap()
        .is_data_complete());

    fx.manager
        .mark_data_complete(&order_ticket, LoadedEndPointData::Object(Some(fx.model.ticket(7))))
        .unwrap();

    let complete = fx
        .manager
        .get_end_point_without_loading(&order_ticket)
        .and_then(RelationEndPoint::as_virtual_object)
        .and_then(|end_point| end_point.complete_state())
        .unwrap();
    assert!(complete.is_synchronized());
    assert_eq!(complete.get_data(), Some(&fx.model.ticket(7)));
    assert_eq!(complete.unsynchronized_opposite_end_points().count(), 0);
    assert_eq!(fx.loader().total_load_count(), 0);
    assert!(fx.manager.is_synchronized(&fx.model.ticket_order_of(7)).unwrap());
}

#[test]
fn customer_orders_set_whole_collection() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_customer(2, &[3]);
    let orders = fx.model.customer_orders_of(1);
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1), fx.model.order(2)]);

    let command = fx
        .manager
        .create_set_collection_command(&orders, vec![fx.model.order(2), fx.model.order(3)])
        .unwrap();
    let expanded = command.expand_to_all_related_objects(&mut fx.manager).unwrap();

    let modified: Vec<_> = expanded
        .commands()
        .iter()
        .map(|command| command.end_point_id().cloned())
        .collect();
    assert_eq!(
        modified,
        vec![
            Some(fx.model.order_customer_of(1)),
            Some(fx.model.order_customer_of(3)),
            Some(fx.model.customer_orders_of(2)),
            Some(orders.clone()),
        ]
    );

    expanded.notify_and_perform(&mut fx.manager).unwrap();

    assert_eq!(fx.orders_of(1), vec![fx.model.order(2), fx.model.order(3)]);
    assert_eq!(fx.customer_of(1), None);
    assert_eq!(fx.customer_of(3), Some(fx.model.customer(1)));
    assert!(fx.orders_of(2).is_empty());
    fx.assert_customers_consistent(&[1, 2, 3], &[1, 2]);
}

#[test]
fn setting_item_without_end_point_is_out_of_sync() {
    let mut fx = Fixture::new();
    let order_ticket = fx.model.order_ticket_of(1);
    fx.loader()
        .set_object(order_ticket.clone(), Some(fx.model.ticket(9)));

    let err = fx
        .manager
        .create_set_command(&order_ticket, Some(fx.model.ticket(9)))
        .unwrap_err();

    assert!(err.is_out_of_sync());
    assert!(err.to_string().contains("OrderTicket"));
}

#[test]
fn delete_order_detaches_all_relations() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_ticket(7, Some(1));

    fx.manager
        .delete_object(&fx.model.order(1), &fx.model.order_definitions())
        .unwrap();

    assert_eq!(fx.customer_of(1), None);
    assert_eq!(fx.orders_of(1), vec![fx.model.order(2)]);
    assert_eq!(fx.ticket_of(1), None);
    assert_eq!(fx.order_of_ticket(7), None);
}

#[test]
fn delete_command_reports_all_failures_up_front() {
    let mut fx = Fixture::new();
    // Order 1's foreign key was never registered
    let composite = fx
        .manager
        .create_object_delete_command(&fx.model.order(1), &fx.model.order_definitions());

    assert_eq!(composite.get_all_exceptions().len(), 1);
    let err = composite.notify_and_perform(&mut fx.manager).unwrap_err();
    assert!(matches!(err, Error::EndPointNotFound(_)));
    assert!(fx.recorder().is_empty());
}

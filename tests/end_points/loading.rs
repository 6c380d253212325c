//! Lazy loading and replay of buffered end points

use crate::common::*;

#[test]
fn virtual_end_point_loads_exactly_once() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    let orders = fx.model.customer_orders_of(1);
    assert_eq!(fx.loader().load_count(&orders), 0);

    let first = fx.orders_of(1);
    let second = fx.orders_of(1);
    fx.manager
        .get_end_point_with_lazy_load(&orders)
        .unwrap()
        .ensure_data_complete()
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.loader().load_count(&orders), 1);
}

#[test]
fn registration_does_not_load() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2, 3]);
    fx.load_ticket(1, Some(1));

    assert_eq!(fx.loader().total_load_count(), 0);
    assert!(!fx
        .manager
        .get_end_point_without_loading(&fx.model.customer_orders_of(1))
        .unwrap()
        .is_data_complete());
}

#[test]
fn failed_load_leaves_end_point_retryable() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);
    let orders = fx.model.customer_orders_of(1);
    fx.loader().fail(orders.clone(), "connection reset");

    let err = fx.manager.get_related_objects(&orders).unwrap_err();
    assert!(matches!(err, Error::Load { .. }));
    assert!(!fx
        .manager
        .get_end_point_without_loading(&orders)
        .unwrap()
        .is_data_complete());

    fx.loader().set_collection(orders.clone(), vec![fx.model.order(1)]);
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
    assert_eq!(fx.loader().load_count(&orders), 2);
    assert!(fx.manager.is_synchronized(&fx.model.order_customer_of(1)).unwrap());
}

#[test]
fn buffered_end_points_are_replayed_on_completion() {
    let mut fx = Fixture::new();
    let orders = fx.model.customer_orders_of(1);
    // Order 2 claims customer 1 but the loaded collection does not list it
    fx.loader().set_collection(orders.clone(), vec![fx.model.order(1)]);
    for order in [1, 2] {
        fx.manager
            .register_real_object_end_point(
                fx.model.order_customer_of(order),
                Some(fx.model.customer(1)),
            )
            .unwrap();
    }

    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);

    let complete = fx
        .manager
        .get_end_point_without_loading(&orders)
        .and_then(RelationEndPoint::as_collection)
        .and_then(|end_point| end_point.complete_state())
        .unwrap();
    assert!(complete.contains_opposite_end_point(&fx.model.order_customer_of(1)));
    assert!(complete.contains_opposite_end_point(&fx.model.order_customer_of(2)));
    assert!(!complete.is_unsynchronized_opposite(&fx.model.order_customer_of(1)));
    assert!(complete.is_unsynchronized_opposite(&fx.model.order_customer_of(2)));

    assert!(fx.manager.is_synchronized(&fx.model.order_customer_of(1)).unwrap());
    assert!(!fx.manager.is_synchronized(&fx.model.order_customer_of(2)).unwrap());
}

#[test]
fn end_point_registered_after_load_is_unsynchronized() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);

    fx.manager
        .register_real_object_end_point(fx.model.order_customer_of(9), Some(fx.model.customer(1)))
        .unwrap();

    assert!(!fx.manager.is_synchronized(&fx.model.order_customer_of(9)).unwrap());
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
}

#[test]
fn lazy_load_disabled_requires_explicit_completion() {
    let config = TrackingConfig::from_toml_str("lazy_load = false").unwrap();
    let mut fx = Fixture::with_config(config);
    let orders = fx.model.customer_orders_of(1);
    fx.manager
        .register_real_object_end_point(fx.model.order_customer_of(1), Some(fx.model.customer(1)))
        .unwrap();

    let err = fx.manager.get_related_objects(&orders).unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));

    fx.manager
        .mark_data_complete(&orders, LoadedEndPointData::Collection(vec![fx.model.order(1)]))
        .unwrap();
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
    assert_eq!(fx.loader().total_load_count(), 0);
}

#[test]
fn mark_data_complete_twice_fails() {
    let mut fx = Fixture::new();
    let order_ticket = fx.model.order_ticket_of(1);
    fx.manager
        .mark_data_complete(&order_ticket, LoadedEndPointData::Object(None))
        .unwrap();

    let err = fx
        .manager
        .mark_data_complete(&order_ticket, LoadedEndPointData::Object(None))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));
}

#[test]
fn change_detection_follows_configuration() {
    for (toml, reorder_is_change) in [
        ("change_detection = \"set\"", false),
        ("change_detection = \"sequence\"", true),
    ] {
        let mut fx = Fixture::with_config(TrackingConfig::from_toml_str(toml).unwrap());
        fx.load_customer(1, &[1, 2]);

        fx.manager
            .set_related_objects(
                &fx.model.customer_orders_of(1),
                vec![fx.model.order(2), fx.model.order(1)],
            )
            .unwrap();

        assert_eq!(fx.orders_of(1), vec![fx.model.order(2), fx.model.order(1)]);
        assert_eq!(fx.manager.has_changed(), reorder_is_change, "{}", toml);
    }
}

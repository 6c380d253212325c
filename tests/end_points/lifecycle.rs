//! Commit, rollback and subordinate transactions

use crate::common::*;

#[test]
fn commit_then_rollback_keeps_committed_data() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_customer(2, &[]);
    fx.manager
        .set_related_object(&fx.model.order_customer_of(1), Some(fx.model.customer(2)))
        .unwrap();

    fx.manager.commit_all_end_points();
    fx.manager.rollback_all_end_points();

    assert_eq!(fx.customer_of(1), Some(fx.model.customer(2)));
    assert_eq!(fx.orders_of(1), vec![fx.model.order(2)]);
    assert_eq!(fx.orders_of(2), vec![fx.model.order(1)]);
    assert!(!fx.manager.has_changed());
}

#[test]
fn rollback_restores_both_sides() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_customer(2, &[3]);
    fx.load_ticket(1, Some(1));
    fx.load_ticket(2, Some(2));

    fx.manager
        .set_related_objects(&fx.model.customer_orders_of(1), vec![fx.model.order(3)])
        .unwrap();
    fx.manager
        .set_related_object(&fx.model.ticket_order_of(2), Some(fx.model.order(1)))
        .unwrap();
    assert!(fx.manager.has_changed());

    fx.manager.rollback_all_end_points();

    assert!(!fx.manager.has_changed());
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1), fx.model.order(2)]);
    assert_eq!(fx.orders_of(2), vec![fx.model.order(3)]);
    assert_eq!(fx.ticket_of(1), Some(fx.model.ticket(1)));
    assert_eq!(fx.ticket_of(2), Some(fx.model.ticket(2)));
    fx.assert_customers_consistent(&[1, 2, 3], &[1, 2]);
    fx.assert_tickets_consistent(&[1, 2], &[1, 2]);
}

#[test]
fn commit_clears_changed_state() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1]);
    fx.manager
        .set_related_object(&fx.model.order_customer_of(1), None)
        .unwrap();
    assert_eq!(fx.manager.changed_end_point_ids().len(), 2);

    fx.manager.commit_all_end_points();

    assert!(!fx.manager.has_changed());
    assert!(fx.manager.changed_end_point_ids().is_empty());
    assert!(!fx.manager.has_been_touched(&fx.model.order_customer_of(1)));
    assert_eq!(
        fx.manager
            .get_original_related_objects(&fx.model.customer_orders_of(1))
            .unwrap(),
        Vec::<ObjectId>::new()
    );
}

#[test]
fn unregister_unchanged_object_forgets_end_points() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    assert_eq!(fx.orders_of(1).len(), 2);

    fx.manager
        .unregister_real_object_end_point(&fx.model.order_customer_of(2))
        .unwrap();

    assert!(!fx.manager.contains(&fx.model.order_customer_of(2)));
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
}

#[test]
fn sub_transaction_changes_reach_parent() {
    let mut fx = Fixture::new();
    fx.load_customer(1, &[1, 2]);
    fx.load_customer(2, &[]);
    assert_eq!(fx.orders_of(1).len(), 2);
    assert!(fx.orders_of(2).is_empty());

    let mut sub = fx
        .model
        .manager_with_config(TrackingConfig::for_sub_transaction());
    for order in [1, 2] {
        sub.register_real_object_end_point(
            fx.model.order_customer_of(order),
            Some(fx.model.customer(1)),
        )
        .unwrap();
    }
    sub.set_related_object(&fx.model.order_customer_of(2), Some(fx.model.customer(2)))
        .unwrap();

    fx.manager.commit_sub_transaction(&sub).unwrap();

    assert_eq!(fx.customer_of(2), Some(fx.model.customer(2)));
    assert_eq!(fx.orders_of(1), vec![fx.model.order(1)]);
    assert_eq!(fx.orders_of(2), vec![fx.model.order(2)]);
    assert!(fx.manager.has_changed());
    fx.assert_customers_consistent(&[1, 2], &[1, 2]);

    fx.manager.rollback_all_end_points();
    assert_eq!(fx.customer_of(2), Some(fx.model.customer(1)));
}

#[test]
fn sub_transaction_cannot_load_parent_with_lazy_load_disabled() {
    let config = TrackingConfig::from_toml_str("lazy_load = false").unwrap();
    let mut fx = Fixture::with_config(config);
    fx.manager
        .register_real_object_end_point(fx.model.order_customer_of(1), Some(fx.model.customer(1)))
        .unwrap();

    let mut sub = fx
        .model
        .manager_with_config(TrackingConfig::for_sub_transaction());
    sub.register_real_object_end_point(fx.model.order_customer_of(1), Some(fx.model.customer(1)))
        .unwrap();
    sub.set_related_object(&fx.model.order_customer_of(1), Some(fx.model.customer(2)))
        .unwrap();
    let loads = fx.loader().total_load_count();

    let err = fx.manager.commit_sub_transaction(&sub).unwrap_err();

    assert!(matches!(err, Error::InvalidOperation(_)));
    assert_eq!(fx.loader().total_load_count(), loads);
    assert!(!fx.manager.has_changed());
    assert!(!fx
        .manager
        .get_end_point_without_loading(&fx.model.customer_orders_of(1))
        .unwrap()
        .is_data_complete());
    assert_eq!(
        fx.manager
            .get_original_related_object(&fx.model.order_customer_of(1))
            .unwrap(),
        Some(fx.model.customer(1))
    );
}

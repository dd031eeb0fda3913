//! Finalization-transaction tests: exactly-once semantics under redelivery,
//! cross-event duplication, and partial correlation ids.

mod common;

use common::*;
use rentfolio::screening::finalize::{finalize, FinalizeOutcome, PaymentEventFacts};

#[test]
fn test_first_delivery_finalizes_order_and_application() {
    let mut conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    let app = create_test_application(&conn, &landlord.id);
    let order = create_test_order(&conn, &app, ServiceLevel::SelfServe);

    let facts = session_event_facts("evt_1", &order, "sess_1");
    let outcome = finalize(&mut conn, &facts).expect("finalize should succeed");

    assert_eq!(
        outcome,
        FinalizeOutcome::Finalized {
            order_id: order.id.clone(),
            application_id: app.id.clone(),
        }
    );

    let order = queries::get_screening_order_by_id(&conn, &order.id)
        .unwrap()
        .unwrap();
    assert!(order.finalized);
    assert_eq!(order.payment_status, "paid");
    assert!(order.paid_at.is_some());
    assert_eq!(order.paid_at, order.finalized_at);
    assert_eq!(order.last_stripe_event_id.as_deref(), Some("evt_1"));
    // Correlation ids backfilled from the event
    assert_eq!(order.stripe_session_id.as_deref(), Some("sess_1"));
    assert_eq!(order.stripe_payment_intent_id.as_deref(), Some("pi_test_1"));

    let app = queries::get_application_by_id(&conn, &app.id)
        .unwrap()
        .unwrap();
    assert_eq!(app.screening_status, ScreeningStatus::Paid);
    assert_eq!(app.screening_order_id.as_deref(), Some(order.id.as_str()));
    assert!(app.screening_paid_at.is_some());

    let event = queries::get_gateway_event(&conn, "evt_1").unwrap().unwrap();
    assert!(event.resolved);
    assert_eq!(event.order_id.as_deref(), Some(order.id.as_str()));
}

#[test]
fn test_same_event_redelivery_is_a_no_op() {
    let mut conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    let app = create_test_application(&conn, &landlord.id);
    let order = create_test_order(&conn, &app, ServiceLevel::SelfServe);

    let facts = session_event_facts("evt_1", &order, "sess_1");
    finalize(&mut conn, &facts).unwrap();

    let first = queries::get_screening_order_by_id(&conn, &order.id)
        .unwrap()
        .unwrap();

    // Gateway retries deliver the exact same event id
    let outcome = finalize(&mut conn, &facts).unwrap();
    assert_eq!(outcome, FinalizeOutcome::AlreadyProcessed);

    let second = queries::get_screening_order_by_id(&conn, &order.id)
        .unwrap()
        .unwrap();
    assert_eq!(first.paid_at, second.paid_at);
    assert_eq!(first.finalized_at, second.finalized_at);
    assert_eq!(first.last_stripe_event_id, second.last_stripe_event_id);
}

#[test]
fn test_different_event_for_same_order_reports_already_finalized() {
    let mut conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    let app = create_test_application(&conn, &landlord.id);
    let order = create_test_order(&conn, &app, ServiceLevel::SelfServe);

    // checkout.session.completed first...
    let facts1 = session_event_facts("evt_1", &order, "sess_1");
    finalize(&mut conn, &facts1).unwrap();
    let first = queries::get_screening_order_by_id(&conn, &order.id)
        .unwrap()
        .unwrap();

    // ...then payment_intent.succeeded for the same purchase
    let facts2 = PaymentEventFacts {
        event_id: "evt_2".to_string(),
        event_type: "payment_intent.succeeded".to_string(),
        order_id: None,
        session_id: None,
        payment_intent_id: Some("pi_test_1".to_string()),
        ..Default::default()
    };
    let outcome = finalize(&mut conn, &facts2).unwrap();
    assert_eq!(
        outcome,
        FinalizeOutcome::AlreadyFinalized {
            order_id: order.id.clone(),
        }
    );

    // Exactly one paid_at value; timestamps untouched by the second event
    let second = queries::get_screening_order_by_id(&conn, &order.id)
        .unwrap()
        .unwrap();
    assert_eq!(first.paid_at, second.paid_at);
    assert_eq!(first.finalized_at, second.finalized_at);
    assert_eq!(second.last_stripe_event_id.as_deref(), Some("evt_1"));

    // Both events recorded in the dedupe ledger
    assert!(queries::get_gateway_event(&conn, "evt_1").unwrap().is_some());
    assert!(queries::get_gateway_event(&conn, "evt_2").unwrap().is_some());

    // Application status stayed paid, not re-advanced or reverted
    let app = queries::get_application_by_id(&conn, &app.id)
        .unwrap()
        .unwrap();
    assert_eq!(app.screening_status, ScreeningStatus::Paid);
}

#[test]
fn test_resolution_falls_back_to_payment_intent_only() {
    let mut conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    let app = create_test_application(&conn, &landlord.id);
    let order = create_test_order(&conn, &app, ServiceLevel::SelfServe);

    // First event records the payment intent on the order
    let facts1 = session_event_facts("evt_1", &order, "sess_1");
    finalize(&mut conn, &facts1).unwrap();

    // A later event carrying only the payment intent still resolves
    let resolved = queries::resolve_order(&conn, None, None, Some("pi_test_1"))
        .unwrap()
        .expect("order should resolve via payment intent");
    assert_eq!(resolved.id, order.id);

    // And an unknown payment intent does not
    assert!(queries::resolve_order(&conn, None, None, Some("pi_other"))
        .unwrap()
        .is_none());
}

#[test]
fn test_resolution_prefers_order_id_then_session() {
    let conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    let app = create_test_application(&conn, &landlord.id);
    let order_a = create_test_order(&conn, &app, ServiceLevel::SelfServe);
    let order_b = create_test_order(&conn, &app, ServiceLevel::SelfServe);
    queries::set_order_stripe_session(&conn, &order_b.id, "sess_b").unwrap();

    // order_id wins over a session id pointing elsewhere
    let resolved = queries::resolve_order(&conn, Some(order_a.id.as_str()), Some("sess_b"), None)
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, order_a.id);

    // Without order_id the session lookup applies
    let resolved = queries::resolve_order(&conn, None, Some("sess_b"), None)
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, order_b.id);
}

#[test]
fn test_unresolvable_event_is_kept_for_reconciliation() {
    let mut conn = setup_test_db();

    let facts = PaymentEventFacts {
        event_id: "evt_orphan".to_string(),
        event_type: "payment_intent.succeeded".to_string(),
        payment_intent_id: Some("pi_unknown".to_string()),
        ..Default::default()
    };

    let outcome = finalize(&mut conn, &facts).unwrap();
    assert_eq!(outcome, FinalizeOutcome::OrderNotFound);

    // The unresolved row exists so an operator can diagnose the orphaned
    // payment - money received, no order.
    let event = queries::get_gateway_event(&conn, "evt_orphan")
        .unwrap()
        .unwrap();
    assert!(!event.resolved);
    assert!(event.order_id.is_none());
    assert_eq!(event.payment_intent_id.as_deref(), Some("pi_unknown"));

    // Redelivery of the orphan event dedupes like any other
    let outcome = finalize(&mut conn, &facts).unwrap();
    assert_eq!(outcome, FinalizeOutcome::AlreadyProcessed);
}

#[test]
fn test_empty_event_id_is_rejected() {
    let mut conn = setup_test_db();
    let facts = PaymentEventFacts::default();
    assert!(finalize(&mut conn, &facts).is_err());
}

#[test]
fn test_backfill_fills_missing_ids_without_touching_timestamps() {
    let mut conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    let app = create_test_application(&conn, &landlord.id);
    let order = create_test_order(&conn, &app, ServiceLevel::SelfServe);

    // Finalize via an event that knows nothing but the order id
    let facts1 = PaymentEventFacts {
        event_id: "evt_1".to_string(),
        event_type: "payment_intent.succeeded".to_string(),
        order_id: Some(order.id.clone()),
        ..Default::default()
    };
    finalize(&mut conn, &facts1).unwrap();
    let first = queries::get_screening_order_by_id(&conn, &order.id)
        .unwrap()
        .unwrap();
    assert!(first.stripe_session_id.is_none());

    // Second event carries the session and payment intent
    let facts2 = session_event_facts("evt_2", &order, "sess_late");
    let outcome = finalize(&mut conn, &facts2).unwrap();
    assert!(matches!(outcome, FinalizeOutcome::AlreadyFinalized { .. }));

    let second = queries::get_screening_order_by_id(&conn, &order.id)
        .unwrap()
        .unwrap();
    assert_eq!(second.stripe_session_id.as_deref(), Some("sess_late"));
    assert_eq!(second.stripe_payment_intent_id.as_deref(), Some("pi_test_1"));
    assert_eq!(first.paid_at, second.paid_at);
    assert_eq!(first.finalized_at, second.finalized_at);
}

#[test]
fn test_screening_status_never_moves_backward_after_paid() {
    let mut conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    let app = create_test_application(&conn, &landlord.id);
    let order = create_test_order(&conn, &app, ServiceLevel::SelfServe);

    finalize(&mut conn, &session_event_facts("evt_1", &order, "sess_1")).unwrap();

    // Direct attempts to move the application backward are rejected
    assert!(!queries::advance_screening_status(&conn, &app.id, ScreeningStatus::Pending).unwrap());
    assert!(!queries::advance_screening_status(&conn, &app.id, ScreeningStatus::Unpaid).unwrap());

    let app = queries::get_application_by_id(&conn, &app.id)
        .unwrap()
        .unwrap();
    assert_eq!(app.screening_status, ScreeningStatus::Paid);
}

//! Test utilities and fixtures for Rentfolio integration tests

#![allow(dead_code)]

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use rentfolio::db::{init_db, init_ledger_db, queries, AppState, DbPool};
pub use rentfolio::models::*;
pub use rentfolio::notify::OpsNotifier;
pub use rentfolio::payments::StripeClient;
pub use rentfolio::screening::finalize::PaymentEventFacts;
pub use rentfolio::screening::redirect::RedirectPolicy;
pub use rentfolio::screening::result::{HashRiskProvider, ProviderHealth};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Single-connection in-memory pool; the one connection keeps the database
/// alive for the whole test.
fn memory_pool(ledger: bool) -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to create test pool");
    {
        let conn = pool.get().expect("Failed to get pooled connection");
        if ledger {
            init_ledger_db(&conn).expect("Failed to initialize ledger schema");
        } else {
            init_db(&conn).expect("Failed to initialize schema");
        }
    }
    pool
}

/// Full application state backed by in-memory databases. The Stripe client
/// carries a known webhook secret so tests can sign payloads; no test path
/// makes outbound API calls.
pub fn test_state() -> AppState {
    AppState {
        db: memory_pool(false),
        ledger: memory_pool(true),
        base_url: "http://api.rentfolio.test".to_string(),
        consent_version: "2025-06".to_string(),
        report_secret: "test-report-secret".to_string(),
        stripe: Some(StripeClient::new("sk_test_xxx", TEST_WEBHOOK_SECRET)),
        redirects: RedirectPolicy::new("https://app.rentfolio.test", vec![], false),
        notifier: OpsNotifier::new(None),
        provider: Arc::new(HashRiskProvider),
        health: ProviderHealth::new(),
    }
}

pub fn create_test_landlord(conn: &Connection) -> Landlord {
    queries::create_landlord(
        conn,
        &CreateLandlord {
            name: "Test Landlord".to_string(),
            email: format!("landlord+{}@example.com", uuid::Uuid::new_v4().as_simple()),
            stripe_customer_id: Some("cus_test_1".to_string()),
        },
    )
    .expect("Failed to create test landlord")
}

/// Create an application that passes the eligibility gate.
pub fn create_test_application(conn: &Connection, landlord_id: &str) -> RentalApplication {
    queries::create_application(
        conn,
        &CreateApplication {
            landlord_id: landlord_id.to_string(),
            property_id: None,
            unit_id: None,
            status: ApplicationStatus::Submitted,
            applicant_name: "Jordan Tester".to_string(),
            applicant_email: "jordan@example.com".to_string(),
            date_of_birth: Some("1992-04-01".to_string()),
            residence_history: vec!["42 Prior Ave, Springfield".to_string()],
            credit_consent: true,
            reference_consent: true,
        },
    )
    .expect("Failed to create test application")
}

pub fn create_test_order(
    conn: &Connection,
    application: &RentalApplication,
    service_level: ServiceLevel,
) -> ScreeningOrder {
    queries::create_screening_order(
        conn,
        &CreateScreeningOrder {
            application_id: application.id.clone(),
            landlord_id: application.landlord_id.clone(),
            property_id: application.property_id.clone(),
            unit_id: application.unit_id.clone(),
            amount_cents: 3999,
            total_amount_cents: 4699,
            currency: "usd".to_string(),
            screening_tier: "standard".to_string(),
            addons: vec!["eviction_history".to_string()],
            service_level,
        },
    )
    .expect("Failed to create test order")
}

/// Facts for a checkout.session.completed event referencing `order`.
pub fn session_event_facts(
    event_id: &str,
    order: &ScreeningOrder,
    session_id: &str,
) -> PaymentEventFacts {
    PaymentEventFacts {
        event_id: event_id.to_string(),
        event_type: "checkout.session.completed".to_string(),
        order_id: Some(order.id.clone()),
        session_id: Some(session_id.to_string()),
        payment_intent_id: Some("pi_test_1".to_string()),
        amount_total_cents: Some(order.total_amount_cents),
        currency: Some(order.currency.clone()),
        application_id: Some(order.application_id.clone()),
        landlord_id: Some(order.landlord_id.clone()),
    }
}

/// Compute a valid `X-Signature` header value for a webhook payload.
pub fn sign_webhook_payload(payload: &[u8], secret: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

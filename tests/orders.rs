//! Order read endpoints and the signed report download link.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn test_app(state: &AppState) -> Router {
    Router::new()
        .merge(rentfolio::handlers::router())
        .with_state(state.clone())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Landlord + application + finalized, result-processed order.
async fn seed_completed_order(state: &AppState) -> (String, String) {
    let (order_id, application_id) = {
        let mut conn = state.db.get().unwrap();
        let landlord = create_test_landlord(&conn);
        let app = create_test_application(&conn, &landlord.id);
        let order = create_test_order(&conn, &app, ServiceLevel::SelfServe);
        rentfolio::screening::finalize::finalize(
            &mut conn,
            &session_event_facts("evt_done", &order, "sess_done"),
        )
        .unwrap();
        (order.id.clone(), app.id.clone())
    };
    rentfolio::screening::result::apply(state, &order_id, &application_id)
        .await
        .unwrap();
    (order_id, application_id)
}

#[tokio::test]
async fn test_unknown_order_is_404() {
    let state = test_state();
    let response = test_app(&state)
        .oneshot(get(
            "/screening/orders/rf_ord_00000000000000000000000000000000",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_order_returns_record() {
    let state = test_state();
    let order_id = {
        let conn = state.db.get().unwrap();
        let landlord = create_test_landlord(&conn);
        let app = create_test_application(&conn, &landlord.id);
        create_test_order(&conn, &app, ServiceLevel::Verified).id
    };

    let response = test_app(&state)
        .oneshot(get(&format!("/screening/orders/{}", order_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["id"], order_id.as_str());
    assert_eq!(body["payment_status"], "unpaid");
    assert_eq!(body["service_level"], "verified");
}

#[tokio::test]
async fn test_report_link_requires_finalized_order() {
    let state = test_state();
    let order_id = {
        let conn = state.db.get().unwrap();
        let landlord = create_test_landlord(&conn);
        let app = create_test_application(&conn, &landlord.id);
        create_test_order(&conn, &app, ServiceLevel::SelfServe).id
    };

    let response = test_app(&state)
        .oneshot(get(&format!("/screening/orders/{}/report", order_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["error"], "order_not_finalized");
}

#[tokio::test]
async fn test_signed_report_link_round_trip() {
    let state = test_state();
    let (order_id, _) = seed_completed_order(&state).await;

    let response = test_app(&state)
        .oneshot(get(&format!("/screening/orders/{}/report", order_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["ok"], true);
    let url = body["url"].as_str().unwrap();
    let path = url
        .strip_prefix("http://api.rentfolio.test")
        .expect("url rooted at base_url");

    // The signed link downloads the report
    let response = test_app(&state).oneshot(get(path)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = response_json(response).await;
    assert_eq!(report["ok"], true);
    assert_eq!(report["order"]["order_id"], order_id.as_str());
    assert!(report["result"]["score"].is_u64());

    // Tampering with the signature invalidates the link
    let tampered = path.replace("sig=", "sig=0");
    let response = test_app(&state).oneshot(get(&tampered)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "report_link_invalid");
}

#[tokio::test]
async fn test_expired_report_link_is_rejected() {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    type HmacSha256 = Hmac<Sha256>;

    let state = test_state();
    let (order_id, _) = seed_completed_order(&state).await;

    // Correctly signed, but for a timestamp in the past
    let expires = chrono::Utc::now().timestamp() - 60;
    let mut mac = HmacSha256::new_from_slice("test-report-secret".as_bytes()).unwrap();
    mac.update(format!("{}.{}", order_id, expires).as_bytes());
    let sig = hex::encode(mac.finalize().into_bytes());

    let response = test_app(&state)
        .oneshot(get(&format!(
            "/screening/orders/{}/report/download?expires={}&sig={}",
            order_id, expires, sig
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "report_link_expired");
}

#[tokio::test]
async fn test_screening_events_readout() {
    let state = test_state();
    let (order_id, application_id) = seed_completed_order(&state).await;

    // Record one event through the webhook-path helper too
    rentfolio::ledger::record_or_log(
        &state.ledger,
        &application_id,
        ScreeningEventType::Paid,
        "gateway",
        Some(&serde_json::json!({ "order_id": order_id })),
    );

    let response = test_app(&state)
        .oneshot(get(&format!(
            "/rental-applications/{}/screening/events",
            application_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let events = response_json(response).await;
    let types: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"report_ready"));
    assert!(types.contains(&"paid"));
}

//! Gateway webhook endpoint.
//!
//! Signature verification happens against the raw request body before any
//! parsing. Once the signature verifies, the response is always HTTP 200 -
//! downstream failures are logged and absorbed, never surfaced, to prevent
//! uncontrolled redelivery storms. Dispatch is a tagged enum keyed by event
//! type so unhandled shapes are an explicit `Ignored` arm.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::msg;
use crate::extractors::Json;
use crate::ledger;
use crate::models::ScreeningEventType;
use crate::payments::{
    CheckoutSessionObject, GatewayEnvelope, PaymentIntentObject, StripeClient, SubscriptionObject,
};
use crate::screening::finalize::{finalize, FinalizeOutcome, PaymentEventFacts};
use crate::screening::result;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/screening-orders", post(handle_screening_webhook))
}

#[derive(Debug, Serialize)]
struct WebhookReply {
    received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignored: Option<bool>,
}

impl WebhookReply {
    fn received() -> Self {
        Self {
            received: true,
            ignored: None,
        }
    }

    fn ignored() -> Self {
        Self {
            received: true,
            ignored: Some(true),
        }
    }
}

/// Parsed webhook event, keyed by gateway event type.
#[derive(Debug)]
enum ParsedEvent {
    /// One of the payment-succeeded shapes; carries everything we could
    /// extract about the purchase.
    PaymentSucceeded(PaymentEventFacts),
    /// Subscription lifecycle - updates the landlord billing-plan mirror.
    SubscriptionLifecycle {
        customer: String,
        subscription_id: String,
        status: String,
        plan: Option<String>,
    },
    /// Event not actionable; carries the application id when the payload
    /// still identifies one, so the skip can be ledgered.
    Ignored {
        why: &'static str,
        application_id: Option<String>,
    },
}

impl ParsedEvent {
    fn ignored(why: &'static str) -> Self {
        Self::Ignored {
            why,
            application_id: None,
        }
    }
}

fn parse_event(envelope: &GatewayEnvelope) -> ParsedEvent {
    match envelope.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            parse_session_event(envelope)
        }
        "payment_intent.succeeded" => parse_payment_intent_event(envelope),
        "customer.subscription.created"
        | "customer.subscription.updated"
        | "customer.subscription.deleted" => parse_subscription_event(envelope),
        _ => ParsedEvent::ignored("unhandled_event_type"),
    }
}

fn parse_session_event(envelope: &GatewayEnvelope) -> ParsedEvent {
    let session: CheckoutSessionObject = match serde_json::from_value(envelope.data.object.clone())
    {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to parse checkout session object: {}", e);
            return ParsedEvent::ignored("malformed_object");
        }
    };

    // checkout.session.completed arrives with payment_status "unpaid" for
    // delayed payment methods; the async_payment_succeeded event follows.
    if session.payment_status != "paid" {
        return ParsedEvent::Ignored {
            why: "session_not_paid_yet",
            application_id: session.metadata.application_id,
        };
    }

    ParsedEvent::PaymentSucceeded(PaymentEventFacts {
        event_id: envelope.id.clone(),
        event_type: envelope.event_type.clone(),
        order_id: session.metadata.order_id,
        session_id: Some(session.id),
        payment_intent_id: session.payment_intent,
        amount_total_cents: session.amount_total,
        currency: session.currency,
        application_id: session.metadata.application_id,
        landlord_id: session.metadata.landlord_id,
    })
}

fn parse_payment_intent_event(envelope: &GatewayEnvelope) -> ParsedEvent {
    let intent: PaymentIntentObject = match serde_json::from_value(envelope.data.object.clone()) {
        Ok(i) => i,
        Err(e) => {
            tracing::error!("Failed to parse payment intent object: {}", e);
            return ParsedEvent::ignored("malformed_object");
        }
    };

    ParsedEvent::PaymentSucceeded(PaymentEventFacts {
        event_id: envelope.id.clone(),
        event_type: envelope.event_type.clone(),
        order_id: intent.metadata.order_id,
        session_id: None,
        payment_intent_id: Some(intent.id),
        amount_total_cents: intent.amount,
        currency: intent.currency,
        application_id: intent.metadata.application_id,
        landlord_id: intent.metadata.landlord_id,
    })
}

fn parse_subscription_event(envelope: &GatewayEnvelope) -> ParsedEvent {
    let subscription: SubscriptionObject = match serde_json::from_value(envelope.data.object.clone())
    {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to parse subscription object: {}", e);
            return ParsedEvent::ignored("malformed_object");
        }
    };

    ParsedEvent::SubscriptionLifecycle {
        customer: subscription.customer,
        subscription_id: subscription.id,
        status: subscription.status,
        plan: subscription.metadata.plan,
    }
}

/// Best-effort enrichment for payment-intent events whose metadata carries
/// no order id: ask the gateway which checkout session the intent belongs to.
async fn enrich_from_session_list(stripe: &StripeClient, facts: &mut PaymentEventFacts) {
    if facts.order_id.is_some() || facts.session_id.is_some() {
        return;
    }
    let Some(pi) = facts.payment_intent_id.clone() else {
        return;
    };

    match stripe.sessions_for_payment_intent(&pi).await {
        Ok(sessions) => {
            if let Some(session) = sessions.into_iter().next() {
                facts.session_id = Some(session.id);
                if facts.order_id.is_none() {
                    facts.order_id = session.metadata.order_id;
                }
                if facts.application_id.is_none() {
                    facts.application_id = session.metadata.application_id;
                }
            }
        }
        Err(e) => {
            tracing::warn!(
                "Session lookup for payment intent {} failed: {}",
                pi,
                e
            );
        }
    }
}

pub async fn handle_screening_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Missing gateway configuration is a deployment error, surfaced as 400
    // like a bad signature - there is no secret to verify against.
    let Some(stripe) = state.stripe.clone() else {
        return error_reply(StatusCode::BAD_REQUEST, msg::STRIPE_NOT_CONFIGURED);
    };

    let Some(signature) = headers.get("x-signature").and_then(|v| v.to_str().ok()) else {
        return error_reply(StatusCode::BAD_REQUEST, msg::SIGNATURE_VERIFICATION_FAILED);
    };

    match stripe.verify_webhook_signature(&body, signature) {
        Ok(true) => {}
        Ok(false) => {
            return error_reply(StatusCode::BAD_REQUEST, msg::SIGNATURE_VERIFICATION_FAILED);
        }
        Err(e) => {
            tracing::warn!("Webhook signature verification error: {}", e);
            return error_reply(StatusCode::BAD_REQUEST, msg::SIGNATURE_VERIFICATION_FAILED);
        }
    }

    // Signature verified: from here on, always 200.
    let envelope: GatewayEnvelope = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse webhook envelope: {}", e);
            return (StatusCode::OK, Json(WebhookReply::ignored())).into_response();
        }
    };

    match parse_event(&envelope) {
        ParsedEvent::PaymentSucceeded(mut facts) => {
            enrich_from_session_list(&stripe, &mut facts).await;
            handle_payment_succeeded(&state, facts).await
        }
        ParsedEvent::SubscriptionLifecycle {
            customer,
            subscription_id,
            status,
            plan,
        } => handle_subscription_lifecycle(&state, &customer, &subscription_id, &status, plan),
        ParsedEvent::Ignored {
            why,
            application_id,
        } => {
            tracing::debug!("Ignoring webhook event {} ({})", envelope.id, why);
            if let Some(application_id) = application_id {
                ledger::record_or_log(
                    &state.ledger,
                    &application_id,
                    ScreeningEventType::WebhookIgnored,
                    "gateway",
                    Some(&serde_json::json!({
                        "event_id": envelope.id,
                        "event_type": envelope.event_type,
                        "reason": why,
                    })),
                );
            }
            (StatusCode::OK, Json(WebhookReply::ignored())).into_response()
        }
    }
}

async fn handle_payment_succeeded(state: &AppState, facts: PaymentEventFacts) -> Response {
    // Scope the connection to the finalization call; result processing
    // re-acquires from the pool.
    let outcome = {
        let mut conn = match state.db.get() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("DB connection error: {}", e);
                return (StatusCode::OK, Json(WebhookReply::received())).into_response();
            }
        };
        finalize(&mut conn, &facts)
    };

    match outcome {
        Ok(FinalizeOutcome::Finalized {
            order_id,
            application_id,
        }) => {
            ledger::record_or_log(
                &state.ledger,
                &application_id,
                ScreeningEventType::Paid,
                "gateway",
                Some(&serde_json::json!({
                    "order_id": order_id,
                    "event_id": facts.event_id,
                    "event_type": facts.event_type,
                })),
            );
            tracing::info!(
                "Order {} finalized by event {} ({})",
                order_id,
                facts.event_id,
                facts.event_type
            );
            match result::apply(state, &order_id, &application_id).await {
                Ok(outcome) => {
                    tracing::debug!("Result processing for order {}: {:?}", order_id, outcome);
                }
                Err(e) => {
                    tracing::error!("Result processing failed for order {}: {}", order_id, e);
                }
            }
        }
        Ok(FinalizeOutcome::AlreadyProcessed) => {
            tracing::debug!("Event {} already processed, no-op", facts.event_id);
        }
        Ok(FinalizeOutcome::AlreadyFinalized { order_id }) => {
            tracing::debug!(
                "Order {} already finalized, event {} recorded",
                order_id,
                facts.event_id
            );
        }
        Ok(FinalizeOutcome::OrderNotFound) => {
            // Money received, no order: kept as an unresolved gateway event
            // for operator reconciliation.
            tracing::warn!(
                "No order resolvable for event {} (session={:?}, payment_intent={:?})",
                facts.event_id,
                facts.session_id,
                facts.payment_intent_id
            );
        }
        Err(e) => {
            tracing::error!("Finalization failed for event {}: {}", facts.event_id, e);
        }
    }

    (StatusCode::OK, Json(WebhookReply::received())).into_response()
}

fn handle_subscription_lifecycle(
    state: &AppState,
    customer: &str,
    subscription_id: &str,
    status: &str,
    plan: Option<String>,
) -> Response {
    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (StatusCode::OK, Json(WebhookReply::received())).into_response();
        }
    };

    match queries::update_landlord_billing(&conn, customer, subscription_id, plan.as_deref(), status)
    {
        Ok(true) => {
            tracing::info!(
                "Billing mirror updated for customer {} (status {})",
                customer,
                status
            );
        }
        Ok(false) => {
            tracing::warn!("No landlord for gateway customer {}", customer);
        }
        Err(e) => {
            tracing::error!("Billing mirror update failed for {}: {}", customer, e);
        }
    }

    (StatusCode::OK, Json(WebhookReply::received())).into_response()
}

fn error_reply(status: StatusCode, code: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "ok": false, "error": code })),
    )
        .into_response()
}

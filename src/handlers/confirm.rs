//! Manual payment confirmation fallback.
//!
//! For the window where the client has returned from checkout but the webhook
//! has not yet arrived. Retrieves the session directly from the gateway and
//! runs the same finalization + result-processing path. The synthetic event
//! id is derived from the session id, so repeated confirm calls dedupe
//! against each other, and a later webhook dedupes against the order-level
//! finalized flag.

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::Json;
use crate::ledger;
use crate::models::ScreeningEventType;
use crate::screening::finalize::{finalize, FinalizeOutcome, PaymentEventFacts};
use crate::screening::result;

pub fn router() -> Router<AppState> {
    Router::new().route("/screening/stripe/confirm", post(confirm_screening_payment))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub ok: bool,
    pub order_id: String,
    pub already_finalized: bool,
}

pub async fn confirm_screening_payment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>> {
    let stripe = state
        .stripe
        .clone()
        .or_bad_request(msg::STRIPE_NOT_CONFIGURED)?;

    let session = stripe.retrieve_checkout_session(&request.session_id).await?;
    if session.payment_status != "paid" {
        return Err(AppError::Conflict(msg::SESSION_NOT_PAID.into()));
    }

    let facts = PaymentEventFacts {
        event_id: format!("manual_confirm_{}", session.id),
        event_type: "manual.session.confirmed".to_string(),
        order_id: session.metadata.order_id.clone(),
        session_id: Some(session.id.clone()),
        payment_intent_id: session.payment_intent.clone(),
        amount_total_cents: session.amount_total,
        currency: session.currency.clone(),
        application_id: session.metadata.application_id.clone(),
        landlord_id: session.metadata.landlord_id.clone(),
    };

    let mut conn = state.db.get()?;
    let outcome = finalize(&mut conn, &facts)?;
    drop(conn);

    match outcome {
        FinalizeOutcome::Finalized {
            order_id,
            application_id,
        } => {
            ledger::record_or_log(
                &state.ledger,
                &application_id,
                ScreeningEventType::Paid,
                "landlord",
                Some(&serde_json::json!({
                    "order_id": order_id,
                    "event_id": facts.event_id,
                    "source": "manual_confirm",
                })),
            );
            if let Err(e) = result::apply(&state, &order_id, &application_id).await {
                tracing::error!("Result processing failed for order {}: {}", order_id, e);
            }
            Ok(Json(ConfirmResponse {
                ok: true,
                order_id,
                already_finalized: false,
            }))
        }
        FinalizeOutcome::AlreadyFinalized { order_id } => Ok(Json(ConfirmResponse {
            ok: true,
            order_id,
            already_finalized: true,
        })),
        FinalizeOutcome::AlreadyProcessed => {
            // This confirm already ran; resolve the order for the response.
            let conn = state.db.get()?;
            let order = queries::resolve_order(&conn, None, Some(session.id.as_str()), None)?
                .or_not_found(msg::ORDER_NOT_FOUND)?;
            Ok(Json(ConfirmResponse {
                ok: true,
                order_id: order.id,
                already_finalized: true,
            }))
        }
        FinalizeOutcome::OrderNotFound => Err(AppError::NotFound(msg::ORDER_NOT_FOUND.into())),
    }
}

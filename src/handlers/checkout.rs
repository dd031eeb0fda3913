//! Checkout creation for screening orders.
//!
//! Gated by the eligibility check and an exact consent-version match; the
//! success/cancel redirect targets go through the origin allowlist before the
//! order or the gateway session exist.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::Json;
use crate::ledger;
use crate::models::{
    ConsentPayload, CreateScreeningOrder, ScreeningEventType, ScreeningStatus, ServiceLevel,
};
use crate::screening::eligibility;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/rental-applications/{id}/screening/checkout",
        post(create_screening_checkout),
    )
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub tier: String,
    #[serde(default)]
    pub addons: Vec<String>,
    pub service_level: ServiceLevel,
    pub consent: ConsentPayload,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub ok: bool,
    pub checkout_url: String,
    pub order_id: String,
    pub reference_id: Option<String>,
}

// Static screening price table (cents). Plan management lives outside the
// screening core; these mirror the published tiers.
fn tier_price_cents(tier: &str) -> Option<i64> {
    match tier {
        "basic" => Some(2999),
        "standard" => Some(3999),
        "premium" => Some(4999),
        _ => None,
    }
}

fn addon_price_cents(addon: &str) -> Option<i64> {
    match addon {
        "eviction_history" => Some(700),
        "income_verification" => Some(900),
        "county_criminal" => Some(1200),
        _ => None,
    }
}

fn service_level_fee_cents(level: ServiceLevel) -> i64 {
    match level {
        ServiceLevel::SelfServe => 0,
        ServiceLevel::Verified => 1500,
        ServiceLevel::VerifiedAi => 2500,
    }
}

pub async fn create_screening_checkout(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response> {
    let conn = state.db.get()?;

    let application = queries::get_application_by_id(&conn, &application_id)?
        .or_not_found(msg::APPLICATION_NOT_FOUND)?;

    // An order that already reached paid must not be re-purchasable.
    if matches!(
        application.screening_status,
        ScreeningStatus::Paid | ScreeningStatus::Complete
    ) {
        return Err(AppError::Conflict(msg::ALREADY_PAID.into()));
    }

    // Every evaluation is ledgered, pass or fail - eligibility failures are
    // a primary support signal.
    let verdict = eligibility::evaluate(&application);
    ledger::record_or_log(
        &state.ledger,
        &application_id,
        ScreeningEventType::EligibilityChecked,
        "landlord",
        Some(&serde_json::json!({
            "eligible": verdict.eligible,
            "reason_code": verdict.reason_code,
        })),
    );

    if !verdict.eligible {
        if !queries::advance_screening_status(&conn, &application_id, ScreeningStatus::Ineligible)?
        {
            tracing::debug!(
                "Application {} screening status not moved to ineligible",
                application_id
            );
        }
        ledger::record_or_log(
            &state.ledger,
            &application_id,
            ScreeningEventType::CheckoutBlocked,
            "landlord",
            Some(&serde_json::json!({
                "reason_code": verdict.reason_code,
                "detail": verdict.detail.clone(),
            })),
        );
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "ok": false,
                "error": "not_eligible",
                "reason_code": verdict.reason_code,
                "detail": verdict.detail,
            })),
        )
            .into_response());
    }

    if !request.consent.given {
        return Err(AppError::BadRequest(msg::CONSENT_NOT_GIVEN.into()));
    }
    if request.consent.version != state.consent_version {
        return Err(AppError::BadRequest(msg::CONSENT_VERSION_MISMATCH.into()));
    }
    queries::record_consent_snapshot(&conn, &application_id, &request.consent)?;

    let amount_cents = tier_price_cents(&request.tier)
        .ok_or_else(|| AppError::BadRequest(msg::UNKNOWN_TIER.into()))?;
    let mut total_amount_cents = amount_cents + service_level_fee_cents(request.service_level);
    for addon in &request.addons {
        total_amount_cents += addon_price_cents(addon)
            .ok_or_else(|| AppError::BadRequest(msg::UNKNOWN_ADDON.into()))?;
    }

    let stripe = state
        .stripe
        .clone()
        .or_bad_request(msg::STRIPE_NOT_CONFIGURED)?;

    // Validate redirect targets before creating anything. The allowlist is
    // total: an unlisted origin fails the whole request.
    let success_probe = state.redirects.build_redirect_url(
        request.success_url.as_deref(),
        "/screening/success",
        &[],
    );
    let cancel_probe =
        state
            .redirects
            .build_redirect_url(request.cancel_url.as_deref(), "/screening/cancelled", &[]);
    if success_probe.is_none() || cancel_probe.is_none() {
        return Err(AppError::BadRequest(msg::INVALID_REDIRECT_ORIGIN.into()));
    }

    let order = queries::create_screening_order(
        &conn,
        &CreateScreeningOrder {
            application_id: application_id.clone(),
            landlord_id: application.landlord_id.clone(),
            property_id: application.property_id.clone(),
            unit_id: application.unit_id.clone(),
            amount_cents,
            total_amount_cents,
            currency: "usd".to_string(),
            screening_tier: request.tier.clone(),
            addons: request.addons.clone(),
            service_level: request.service_level,
        },
    )?;

    let success_url = state
        .redirects
        .build_redirect_url(
            request.success_url.as_deref(),
            "/screening/success",
            &[("order", order.id.as_str()), ("status", "success")],
        )
        .or_bad_request(msg::INVALID_REDIRECT_ORIGIN)?;
    let cancel_url = state
        .redirects
        .build_redirect_url(
            request.cancel_url.as_deref(),
            "/screening/cancelled",
            &[("order", order.id.as_str()), ("status", "cancelled")],
        )
        .or_bad_request(msg::INVALID_REDIRECT_ORIGIN)?;

    let (session_id, checkout_url) = stripe
        .create_checkout_session(&order, &success_url, &cancel_url)
        .await?;

    queries::set_order_stripe_session(&conn, &order.id, &session_id)?;
    if !queries::advance_screening_status(&conn, &application_id, ScreeningStatus::Pending)? {
        tracing::debug!(
            "Application {} screening status not moved to pending",
            application_id
        );
    }

    ledger::record_or_log(
        &state.ledger,
        &application_id,
        ScreeningEventType::CheckoutCreated,
        "landlord",
        Some(&serde_json::json!({
            "order_id": order.id,
            "session_id": session_id,
            "tier": request.tier,
            "service_level": request.service_level.as_str(),
            "total_amount_cents": total_amount_cents,
        })),
    );

    Ok(Json(CheckoutResponse {
        ok: true,
        checkout_url,
        order_id: order.id.clone(),
        reference_id: order.reference_id,
    })
    .into_response())
}

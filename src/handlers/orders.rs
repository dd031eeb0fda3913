//! Order read endpoints and the signed report download link.

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::{Json, Query};
use crate::ledger;
use crate::models::{ScreeningEvent, ScreeningOrder};

type HmacSha256 = Hmac<Sha256>;

/// Report links stay valid for 15 minutes.
const REPORT_LINK_TTL_SECS: i64 = 900;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/screening/orders/{id}", get(get_screening_order))
        .route("/screening/orders/{id}/report", get(get_report_link))
        .route(
            "/screening/orders/{id}/report/download",
            get(download_report),
        )
        .route(
            "/rental-applications/{id}/screening/events",
            get(list_screening_events),
        )
}

pub async fn get_screening_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<ScreeningOrder>> {
    let conn = state.db.get()?;
    let order =
        queries::get_screening_order_by_id(&conn, &order_id)?.or_not_found(msg::ORDER_NOT_FOUND)?;
    Ok(Json(order))
}

#[derive(Debug, Serialize)]
pub struct ReportLinkResponse {
    pub ok: bool,
    pub url: String,
    pub expires_at: i64,
}

/// hex(HMAC-SHA256(secret, "<order_id>.<expires>"))
fn report_signature(secret: &str, order_id: &str, expires: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("invalid report secret".into()))?;
    mac.update(format!("{}.{}", order_id, expires).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub async fn get_report_link(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<ReportLinkResponse>> {
    let conn = state.db.get()?;
    let order =
        queries::get_screening_order_by_id(&conn, &order_id)?.or_not_found(msg::ORDER_NOT_FOUND)?;

    if !order.finalized {
        return Err(AppError::Conflict(msg::ORDER_NOT_FINALIZED.into()));
    }

    let expires_at = chrono::Utc::now().timestamp() + REPORT_LINK_TTL_SECS;
    let sig = report_signature(&state.report_secret, &order.id, expires_at)?;
    let url = format!(
        "{}/screening/orders/{}/report/download?expires={}&sig={}",
        state.base_url, order.id, expires_at, sig
    );

    Ok(Json(ReportLinkResponse {
        ok: true,
        url,
        expires_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub expires: i64,
    pub sig: String,
}

#[derive(Debug, Serialize)]
pub struct ScreeningReport {
    pub ok: bool,
    pub order: ReportOrderSummary,
    pub result: Option<serde_json::Value>,
    pub ai: Option<serde_json::Value>,
    pub generated_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ReportOrderSummary {
    pub order_id: String,
    pub reference_id: Option<String>,
    pub application_id: String,
    pub screening_tier: String,
    pub addons: Vec<String>,
    pub service_level: String,
    pub paid_at: Option<i64>,
}

pub async fn download_report(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<ScreeningReport>> {
    if query.expires < chrono::Utc::now().timestamp() {
        return Err(AppError::BadRequest(msg::REPORT_LINK_EXPIRED.into()));
    }

    let expected = report_signature(&state.report_secret, &order_id, query.expires)?;
    // Constant-time comparison; a signed URL is a bearer credential.
    let matches: bool = expected
        .as_bytes()
        .ct_eq(query.sig.as_bytes())
        .into();
    if expected.len() != query.sig.len() || !matches {
        return Err(AppError::BadRequest(msg::REPORT_LINK_INVALID.into()));
    }

    let conn = state.db.get()?;
    let order =
        queries::get_screening_order_by_id(&conn, &order_id)?.or_not_found(msg::ORDER_NOT_FOUND)?;
    let application = queries::get_application_by_id(&conn, &order.application_id)?
        .or_not_found(msg::APPLICATION_NOT_FOUND)?;

    let result = application
        .screening_result
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;
    let ai = application
        .screening_ai
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(Json(ScreeningReport {
        ok: true,
        order: ReportOrderSummary {
            order_id: order.id,
            reference_id: order.reference_id,
            application_id: order.application_id,
            screening_tier: order.screening_tier,
            addons: order.addons,
            service_level: order.service_level.as_str().to_string(),
            paid_at: order.paid_at,
        },
        result,
        ai,
        generated_at: chrono::Utc::now().timestamp(),
    }))
}

/// Ledger readout for one application, oldest first. Support tooling reads
/// this to reconstruct what the screening core did and why.
pub async fn list_screening_events(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> Result<Json<Vec<ScreeningEvent>>> {
    let conn = state.db.get()?;
    queries::get_application_by_id(&conn, &application_id)?
        .or_not_found(msg::APPLICATION_NOT_FOUND)?;

    let ledger_conn = state.ledger.get()?;
    let events = ledger::list_for_application(&ledger_conn, &application_id)?;
    Ok(Json(events))
}

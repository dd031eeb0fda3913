//! Screening-result processing.
//!
//! Runs once per order after first-time finalization: computes the risk
//! result through the injected `ResultProvider`, writes it onto the
//! application, and routes verified-tier orders into the human-review queue
//! with a single operator-notification attempt.
//!
//! The `screening_status == complete` guard is a second idempotency layer,
//! independent of the webhook-level dedupe ledger: it protects against a
//! manual confirmation racing the webhook path.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::ledger;
use crate::models::{RentalApplication, ScreeningEventType, ScreeningOrder, ScreeningStatus};
use crate::notify::ReviewNotification;

pub const PROVIDER_NAME: &str = "rentfolio-risk-v1";

/// Failure classes from the screening-result provider. Each maps to a
/// distinct user-facing message and is stamped on the health tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    NotConfigured,
    Validation(String),
    RateLimited,
    Timeout,
}

impl ProviderError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "provider_not_configured",
            Self::Validation(_) => "provider_validation_error",
            Self::RateLimited => "provider_rate_limited",
            Self::Timeout => "provider_timeout",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotConfigured => "Screening provider is not configured for this account",
            Self::Validation(_) => "The application could not be submitted for screening",
            Self::RateLimited => "Screening is temporarily busy; try again shortly",
            Self::Timeout => "Screening did not respond in time; try again shortly",
        }
    }

    /// Validation failures are permanent; everything else may succeed on a
    /// later attempt and leaves the application retryable.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Risk band derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

/// Computed screening result, stored as JSON on the application.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningResult {
    pub score: u8,
    pub band: RiskBand,
    pub recommendation: &'static str,
    pub computed_at: i64,
}

/// AI verification payload for verified_ai orders.
#[derive(Debug, Clone, Serialize)]
pub struct AiAssessment {
    pub model: &'static str,
    pub confidence: f64,
    pub summary: String,
}

/// Seam for the downstream screening-result provider.
///
/// The deployment here ships the deterministic hash heuristic; a real bureau
/// integration implements the same trait.
pub trait ResultProvider: Send + Sync {
    fn compute(
        &self,
        application: &RentalApplication,
        order: &ScreeningOrder,
    ) -> std::result::Result<ScreeningResult, ProviderError>;
}

/// Stub provider: risk signal derived from a stable hash of the application
/// id, so repeated computation for the same application is reproducible.
pub struct HashRiskProvider;

impl HashRiskProvider {
    fn stable_hash(application_id: &str) -> u64 {
        let digest = Sha256::digest(application_id.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }
}

impl ResultProvider for HashRiskProvider {
    fn compute(
        &self,
        application: &RentalApplication,
        _order: &ScreeningOrder,
    ) -> std::result::Result<ScreeningResult, ProviderError> {
        let hash = Self::stable_hash(&application.id);
        let score = (hash % 101) as u8;
        let band = match score {
            0..=33 => RiskBand::Low,
            34..=66 => RiskBand::Moderate,
            _ => RiskBand::High,
        };
        let recommendation = match band {
            RiskBand::Low => "accept",
            RiskBand::Moderate => "review",
            RiskBand::High => "decline",
        };
        Ok(ScreeningResult {
            score,
            band,
            recommendation,
            computed_at: chrono::Utc::now().timestamp(),
        })
    }
}

/// Deterministic AI payload for verified_ai orders, derived from the same
/// stable hash as the risk score.
fn ai_assessment(application: &RentalApplication, result: &ScreeningResult) -> AiAssessment {
    let hash = HashRiskProvider::stable_hash(&application.id);
    // Confidence in [0.50, 0.99]
    let confidence = 0.50 + ((hash >> 8) % 50) as f64 / 100.0;
    AiAssessment {
        model: "rentfolio-ai-risk-v1",
        confidence,
        summary: format!(
            "Automated assessment places this applicant in the {:?} risk band",
            result.band
        )
        .to_lowercase(),
    }
}

/// Most recent provider failure, for health reporting. Injected into
/// `AppState` rather than living as module-global state.
#[derive(Clone, Default)]
pub struct ProviderHealth {
    inner: Arc<Mutex<Option<ProviderIncident>>>,
}

#[derive(Debug, Clone)]
pub struct ProviderIncident {
    pub code: &'static str,
    pub at: i64,
}

impl ProviderHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&self, error: &ProviderError) {
        let incident = ProviderIncident {
            code: error.code(),
            at: chrono::Utc::now().timestamp(),
        };
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(incident);
        }
    }

    pub fn last_failure(&self) -> Option<ProviderIncident> {
        self.inner.lock().ok().and_then(|g| g.clone())
    }
}

/// Outcome of one result-processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Result computed and written; queue/notification side effects done.
    Applied,
    /// The application was already complete - nothing to do.
    Skipped,
    /// The provider rejected or did not answer; `code` is from the
    /// `ProviderError` taxonomy.
    Failed { code: &'static str },
}

/// Compute and attach the screening result for a freshly finalized order.
pub async fn apply(state: &AppState, order_id: &str, application_id: &str) -> Result<ApplyOutcome> {
    let conn = state.db.get()?;

    let application = queries::get_application_by_id(&conn, application_id)?
        .or_not_found(msg::APPLICATION_NOT_FOUND)?;

    // Second idempotency layer: a manual confirmation racing the webhook
    // path lands here after the first writer completed.
    if application.screening_status == ScreeningStatus::Complete {
        return Ok(ApplyOutcome::Skipped);
    }

    let order =
        queries::get_screening_order_by_id(&conn, order_id)?.or_not_found(msg::ORDER_NOT_FOUND)?;

    let result = match state.provider.compute(&application, &order) {
        Ok(r) => r,
        Err(e) => {
            state.health.record_failure(&e);
            tracing::error!(
                "Screening provider failed for application {}: {} ({})",
                application_id,
                e.code(),
                e.user_message()
            );
            if e.is_permanent() {
                queries::mark_screening_failed(&conn, application_id)?;
            }
            ledger::record_or_log(
                &state.ledger,
                application_id,
                ScreeningEventType::ResultFailed,
                "system",
                Some(&serde_json::json!({
                    "order_id": order_id,
                    "code": e.code(),
                    "permanent": e.is_permanent(),
                })),
            );
            return Ok(ApplyOutcome::Failed { code: e.code() });
        }
    };

    let ai_json = if order.service_level == crate::models::ServiceLevel::VerifiedAi {
        Some(serde_json::to_string(&ai_assessment(&application, &result))?)
    } else {
        None
    };
    let result_json = serde_json::to_string(&result)?;

    let advanced = queries::set_screening_result(
        &conn,
        application_id,
        PROVIDER_NAME,
        &result_json,
        ai_json.as_deref(),
    )?;
    if !advanced {
        // A concurrent processor won the CAS and wrote the result first.
        return Ok(ApplyOutcome::Skipped);
    }

    // Verified tiers get a human-review work item, at most once per order.
    // Queue insertion and notification are idempotent-by-guard, not wrapped
    // in the finalization transaction.
    if order.service_level.requires_review() {
        if let Some(entry) = queries::try_enqueue_verified_review(&conn, &order, &application)? {
            let notification = ReviewNotification::for_entry(&entry);
            match state.notifier.notify_review(&notification).await {
                Ok(()) => {
                    queries::record_queue_notify_outcome(&conn, &entry.id, true, None)?;
                }
                Err(code) => {
                    tracing::warn!(
                        "Ops notification failed for queue entry {} (order {}): {}",
                        entry.id,
                        order_id,
                        code
                    );
                    queries::record_queue_notify_outcome(&conn, &entry.id, false, Some(code.as_str()))?;
                    ledger::record_or_log(
                        &state.ledger,
                        application_id,
                        ScreeningEventType::NotifyFailed,
                        "system",
                        Some(&serde_json::json!({
                            "order_id": order_id,
                            "queue_id": entry.id,
                            "error": code,
                        })),
                    );
                }
            }
        }
    }

    ledger::record_or_log(
        &state.ledger,
        application_id,
        ScreeningEventType::ReportReady,
        "system",
        Some(&serde_json::json!({
            "order_id": order_id,
            "score": result.score,
            "band": result.band,
        })),
    );

    Ok(ApplyOutcome::Applied)
}

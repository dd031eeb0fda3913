use serde::{Deserialize, Serialize};

/// Screening lifecycle transition types recorded in the event ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningEventType {
    EligibilityChecked,
    CheckoutBlocked,
    CheckoutCreated,
    Paid,
    WebhookIgnored,
    ReportReady,
    ResultFailed,
    NotifyFailed,
}

impl ScreeningEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EligibilityChecked => "eligibility_checked",
            Self::CheckoutBlocked => "checkout_blocked",
            Self::CheckoutCreated => "checkout_created",
            Self::Paid => "paid",
            Self::WebhookIgnored => "webhook_ignored",
            Self::ReportReady => "report_ready",
            Self::ResultFailed => "result_failed",
            Self::NotifyFailed => "notify_failed",
        }
    }
}

/// One append-only ledger row. Used for support debugging and idempotency
/// inspection, never read on the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningEvent {
    pub id: String,
    pub application_id: String,
    pub event_type: String,
    pub actor: String,
    /// Free-form context (JSON).
    pub meta: Option<String>,
    pub at: i64,
}

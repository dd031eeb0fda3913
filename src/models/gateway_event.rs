use serde::{Deserialize, Serialize};

/// Durable record of one handled gateway webhook event.
///
/// The row's existence is the dedupe signal: it is written if and only if the
/// event was durably accepted (inside the finalization transaction), so a
/// redelivered event finds the row and becomes a no-op. `resolved = false`
/// marks events that arrived before their order could be found, kept for
/// manual reconciliation of orphaned payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// The gateway's own event id - globally unique and stable across
    /// redeliveries.
    pub event_id: String,
    pub event_type: String,
    pub order_id: Option<String>,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub resolved: bool,
    pub created_at: i64,
}

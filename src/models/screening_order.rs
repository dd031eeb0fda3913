use serde::{Deserialize, Serialize};

/// Purchased service level for a screening order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    SelfServe,
    Verified,
    VerifiedAi,
}

impl ServiceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfServe => "self_serve",
            Self::Verified => "verified",
            Self::VerifiedAi => "verified_ai",
        }
    }

    /// Whether this level routes through the human-review queue.
    pub fn requires_review(&self) -> bool {
        matches!(self, Self::Verified | Self::VerifiedAi)
    }
}

impl std::str::FromStr for ServiceLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self_serve" => Ok(Self::SelfServe),
            "verified" => Ok(Self::Verified),
            "verified_ai" => Ok(Self::VerifiedAi),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ServiceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One screening purchase attempt.
///
/// Created at checkout-session creation, mutated only by finalization (paid
/// state) and the result processor (nothing else touches the lifecycle
/// fields). Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningOrder {
    pub id: String,
    /// Human-facing reference (SCR-XXXXXXXX), shown on receipts.
    pub reference_id: Option<String>,

    pub application_id: String,
    pub landlord_id: String,
    pub property_id: Option<String>,
    pub unit_id: Option<String>,

    // Commercial terms (cents)
    pub amount_cents: i64,
    pub total_amount_cents: i64,
    pub currency: String,
    pub screening_tier: String,
    pub addons: Vec<String>,
    pub service_level: ServiceLevel,

    // Payment linkage, filled in progressively as each ID becomes known
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,

    // Lifecycle. Once finalized is set, payment_status stays "paid" and
    // paid_at/finalized_at never change.
    pub payment_status: String,
    pub finalized: bool,
    pub finalized_at: Option<i64>,
    pub paid_at: Option<i64>,
    pub last_stripe_event_id: Option<String>,

    pub created_at: i64,
}

/// Data required to create a screening order at checkout time.
#[derive(Debug, Clone)]
pub struct CreateScreeningOrder {
    pub application_id: String,
    pub landlord_id: String,
    pub property_id: Option<String>,
    pub unit_id: Option<String>,
    pub amount_cents: i64,
    pub total_amount_cents: i64,
    pub currency: String,
    pub screening_tier: String,
    pub addons: Vec<String>,
    pub service_level: ServiceLevel,
}

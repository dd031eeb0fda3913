//! Prefixed ID generation for Rentfolio entities.
//!
//! All IDs use an `rf_` brand prefix to guarantee collision avoidance with
//! payment provider IDs (Stripe's `cs_`, `pi_`, `cus_`, `evt_`, etc.).
//!
//! Format: `rf_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &[
    "rf_app_",
    "rf_ord_",
    "rf_lld_",
    "rf_prop_",
    "rf_vsq_",
    "rf_led_",
];

/// Validate that a string is a valid Rentfolio prefixed ID.
///
/// This is a cheap check to reject garbage before hitting the database.
/// Validates format: `rf_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];

    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in Rentfolio.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Application,
    ScreeningOrder,
    Landlord,
    Property,
    QueueEntry,
    LedgerEvent,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Application => "rf_app",
            Self::ScreeningOrder => "rf_ord",
            Self::Landlord => "rf_lld",
            Self::Property => "rf_prop",
            Self::QueueEntry => "rf_vsq",
            Self::LedgerEvent => "rf_led",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

/// Human-facing order reference, shown on receipts and support tickets.
/// Short uppercase suffix; uniqueness is enforced by `orderId`, not this.
pub fn gen_order_reference() -> String {
    let hex = Uuid::new_v4().as_simple().to_string();
    format!("SCR-{}", hex[..8].to_uppercase())
}

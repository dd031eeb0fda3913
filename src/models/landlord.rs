use serde::{Deserialize, Serialize};

/// Landlord account with its billing-plan mirror.
///
/// The billing fields shadow the payment gateway's subscription state; they
/// are updated by subscription-lifecycle webhook events only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Landlord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub billing_plan: Option<String>,
    pub plan_status: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data required to create a landlord.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLandlord {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
}

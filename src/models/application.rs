use serde::{Deserialize, Serialize};

/// Application lifecycle status (distinct from the screening sub-state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Declined,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "under_review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            "withdrawn" => Ok(Self::Withdrawn),
            _ => Err(()),
        }
    }
}

/// Screening sub-state on a rental application.
///
/// Moves forward only: unpaid -> pending -> paid -> complete, or -> failed.
/// `ineligible` is lateral to `unpaid` (a blocked checkout can be retried
/// once the application is fixed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStatus {
    Unpaid,
    Ineligible,
    Pending,
    Paid,
    Complete,
    Failed,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Ineligible => "ineligible",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Unpaid | Self::Ineligible => 0,
            Self::Pending => 1,
            Self::Paid => 2,
            Self::Complete | Self::Failed => 3,
        }
    }

    /// Whether a transition to `next` is legal. Terminal states never move.
    pub fn can_advance_to(self, next: ScreeningStatus) -> bool {
        if self == next || matches!(self, Self::Complete | Self::Failed) {
            return false;
        }
        match (self, next) {
            (Self::Unpaid, Self::Ineligible) | (Self::Ineligible, Self::Unpaid) => true,
            _ => next.rank() > self.rank(),
        }
    }
}

impl std::str::FromStr for ScreeningStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "ineligible" => Ok(Self::Ineligible),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rental application with its embedded screening sub-state.
///
/// The screening fields are only ever written by the screening core (checkout,
/// finalization, result processing) - never by general CRUD routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalApplication {
    pub id: String,
    pub landlord_id: String,
    pub property_id: Option<String>,
    pub unit_id: Option<String>,
    pub status: ApplicationStatus,

    pub applicant_name: String,
    pub applicant_email: String,
    pub date_of_birth: Option<String>,
    /// Prior addresses, newest first (JSON array in storage).
    pub residence_history: Vec<String>,

    // Consent snapshot, captured at checkout time
    pub credit_consent: bool,
    pub reference_consent: bool,
    pub consent_version: Option<String>,
    pub consent_timestamp: Option<i64>,
    pub consent_text_hash: Option<String>,

    // Screening sub-state
    pub screening_status: ScreeningStatus,
    pub screening_provider: Option<String>,
    pub screening_order_id: Option<String>,
    pub screening_paid_at: Option<i64>,
    /// Risk result payload (JSON), present once screening completes.
    pub screening_result: Option<String>,
    /// AI verification payload (JSON), present for verified_ai orders.
    pub screening_ai: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Data required to create a rental application (seed/dev/test surface).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApplication {
    pub landlord_id: String,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub unit_id: Option<String>,
    pub status: ApplicationStatus,
    pub applicant_name: String,
    pub applicant_email: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub residence_history: Vec<String>,
    #[serde(default)]
    pub credit_consent: bool,
    #[serde(default)]
    pub reference_consent: bool,
}

/// Consent payload supplied with a checkout request.
///
/// `version` must match the currently configured consent-text version
/// exactly; a stale client gets a `consent_version_mismatch` rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsentPayload {
    pub given: bool,
    pub timestamp: i64,
    pub version: String,
    #[serde(default)]
    pub text_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screening_status_moves_forward_only() {
        use ScreeningStatus::*;

        assert!(Unpaid.can_advance_to(Pending));
        assert!(Unpaid.can_advance_to(Paid));
        assert!(Pending.can_advance_to(Paid));
        assert!(Paid.can_advance_to(Complete));
        assert!(Paid.can_advance_to(Failed));

        assert!(!Paid.can_advance_to(Pending));
        assert!(!Paid.can_advance_to(Unpaid));
        assert!(!Complete.can_advance_to(Paid));
        assert!(!Complete.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Paid));
        assert!(!Paid.can_advance_to(Paid));
    }

    #[test]
    fn test_ineligible_is_lateral_to_unpaid() {
        use ScreeningStatus::*;

        assert!(Unpaid.can_advance_to(Ineligible));
        assert!(Ineligible.can_advance_to(Unpaid));
        assert!(Ineligible.can_advance_to(Pending));
        assert!(!Paid.can_advance_to(Ineligible));
    }
}

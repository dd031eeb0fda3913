//! Pre-checkout eligibility gate.
//!
//! An application must be in a screening-eligible state, carry both consents,
//! and have a minimally complete applicant profile before a checkout session
//! may be created. Eligibility failures are a primary support signal, so
//! every evaluation is written to the event ledger by the caller.

use crate::models::{ApplicationStatus, RentalApplication};

pub mod reason {
    pub const OK: &str = "ok";
    pub const APPLICATION_STATUS: &str = "application_status";
    pub const MISSING_CREDIT_CONSENT: &str = "missing_credit_consent";
    pub const MISSING_REFERENCE_CONSENT: &str = "missing_reference_consent";
    pub const MISSING_DATE_OF_BIRTH: &str = "missing_date_of_birth";
    pub const MISSING_RESIDENCE_HISTORY: &str = "missing_residence_history";
}

/// Outcome of one eligibility evaluation.
#[derive(Debug, Clone)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason_code: &'static str,
    pub detail: Option<String>,
}

impl Eligibility {
    fn pass() -> Self {
        Self {
            eligible: true,
            reason_code: reason::OK,
            detail: None,
        }
    }

    fn fail(reason_code: &'static str, detail: String) -> Self {
        Self {
            eligible: false,
            reason_code,
            detail: Some(detail),
        }
    }
}

/// Application statuses in which screening may be purchased.
fn is_screening_eligible_status(status: ApplicationStatus) -> bool {
    matches!(
        status,
        ApplicationStatus::Submitted | ApplicationStatus::UnderReview | ApplicationStatus::Approved
    )
}

/// Rules checked in order, first failure wins.
pub fn evaluate(application: &RentalApplication) -> Eligibility {
    if !is_screening_eligible_status(application.status) {
        return Eligibility::fail(
            reason::APPLICATION_STATUS,
            format!(
                "application status '{}' is not screening-eligible",
                application.status.as_str()
            ),
        );
    }

    if !application.credit_consent {
        return Eligibility::fail(
            reason::MISSING_CREDIT_CONSENT,
            "credit-check consent not given".to_string(),
        );
    }

    if !application.reference_consent {
        return Eligibility::fail(
            reason::MISSING_REFERENCE_CONSENT,
            "reference-check consent not given".to_string(),
        );
    }

    if application
        .date_of_birth
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .is_none()
    {
        return Eligibility::fail(
            reason::MISSING_DATE_OF_BIRTH,
            "applicant date of birth missing".to_string(),
        );
    }

    if application.residence_history.is_empty() {
        return Eligibility::fail(
            reason::MISSING_RESIDENCE_HISTORY,
            "at least one residential-history address required".to_string(),
        );
    }

    Eligibility::pass()
}

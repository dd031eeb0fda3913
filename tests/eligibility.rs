//! Eligibility gate tests: ordered rules, first failure wins.

mod common;

use common::*;
use rentfolio::screening::eligibility::{evaluate, reason};

fn eligible_application() -> RentalApplication {
    let conn = setup_test_db();
    let landlord = create_test_landlord(&conn);
    create_test_application(&conn, &landlord.id)
}

#[test]
fn test_complete_application_is_eligible() {
    let app = eligible_application();
    let verdict = evaluate(&app);
    assert!(verdict.eligible);
    assert_eq!(verdict.reason_code, reason::OK);
    assert!(verdict.detail.is_none());
}

#[test]
fn test_draft_application_is_not_eligible() {
    let mut app = eligible_application();
    app.status = ApplicationStatus::Draft;
    let verdict = evaluate(&app);
    assert!(!verdict.eligible);
    assert_eq!(verdict.reason_code, reason::APPLICATION_STATUS);
}

#[test]
fn test_declined_and_withdrawn_are_not_eligible() {
    for status in [ApplicationStatus::Declined, ApplicationStatus::Withdrawn] {
        let mut app = eligible_application();
        app.status = status;
        assert!(!evaluate(&app).eligible);
    }
}

#[test]
fn test_under_review_and_approved_are_eligible() {
    for status in [ApplicationStatus::UnderReview, ApplicationStatus::Approved] {
        let mut app = eligible_application();
        app.status = status;
        assert!(evaluate(&app).eligible);
    }
}

#[test]
fn test_missing_credit_consent() {
    let mut app = eligible_application();
    app.credit_consent = false;
    let verdict = evaluate(&app);
    assert!(!verdict.eligible);
    assert_eq!(verdict.reason_code, reason::MISSING_CREDIT_CONSENT);
}

#[test]
fn test_missing_reference_consent() {
    let mut app = eligible_application();
    app.reference_consent = false;
    let verdict = evaluate(&app);
    assert!(!verdict.eligible);
    assert_eq!(verdict.reason_code, reason::MISSING_REFERENCE_CONSENT);
}

#[test]
fn test_missing_date_of_birth() {
    let mut app = eligible_application();
    app.date_of_birth = None;
    assert_eq!(
        evaluate(&app).reason_code,
        reason::MISSING_DATE_OF_BIRTH
    );

    // Whitespace-only counts as missing
    app.date_of_birth = Some("   ".to_string());
    assert_eq!(
        evaluate(&app).reason_code,
        reason::MISSING_DATE_OF_BIRTH
    );
}

#[test]
fn test_missing_residence_history() {
    let mut app = eligible_application();
    app.residence_history.clear();
    let verdict = evaluate(&app);
    assert!(!verdict.eligible);
    assert_eq!(verdict.reason_code, reason::MISSING_RESIDENCE_HISTORY);
}

#[test]
fn test_first_failure_wins() {
    // Status failure outranks every later rule
    let mut app = eligible_application();
    app.status = ApplicationStatus::Draft;
    app.credit_consent = false;
    app.date_of_birth = None;
    assert_eq!(evaluate(&app).reason_code, reason::APPLICATION_STATUS);

    // Then consent, before profile completeness
    let mut app = eligible_application();
    app.credit_consent = false;
    app.date_of_birth = None;
    assert_eq!(
        evaluate(&app).reason_code,
        reason::MISSING_CREDIT_CONSENT
    );
}

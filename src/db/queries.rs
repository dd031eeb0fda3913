use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::id::{gen_order_reference, EntityType};
use crate::models::*;

use super::from_row::{
    query_one, APPLICATION_COLS, GATEWAY_EVENT_COLS, LANDLORD_COLS, ORDER_COLS, QUEUE_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Landlords ============

pub fn create_landlord(conn: &Connection, input: &CreateLandlord) -> Result<Landlord> {
    let id = EntityType::Landlord.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO landlords (id, name, email, stripe_customer_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![&id, &input.name, &input.email, &input.stripe_customer_id, now],
    )?;

    Ok(Landlord {
        id,
        name: input.name.clone(),
        email: input.email.clone(),
        billing_plan: None,
        plan_status: None,
        stripe_customer_id: input.stripe_customer_id.clone(),
        stripe_subscription_id: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_landlord_by_id(conn: &Connection, id: &str) -> Result<Option<Landlord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM landlords WHERE id = ?1", LANDLORD_COLS),
        &[&id],
    )
}

/// Update the billing-plan mirror from a subscription-lifecycle event.
/// Keyed by the gateway's customer id; returns false when no landlord matches.
pub fn update_landlord_billing(
    conn: &Connection,
    stripe_customer_id: &str,
    subscription_id: &str,
    plan: Option<&str>,
    plan_status: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE landlords
         SET billing_plan = COALESCE(?1, billing_plan),
             plan_status = ?2,
             stripe_subscription_id = ?3,
             updated_at = ?4
         WHERE stripe_customer_id = ?5",
        params![plan, plan_status, subscription_id, now(), stripe_customer_id],
    )?;
    Ok(affected > 0)
}

// ============ Properties ============

/// Create a property, returning its generated id. Properties are plain
/// linkage targets here; their CRUD surface lives outside the screening core.
pub fn create_property(
    conn: &Connection,
    landlord_id: &str,
    address: &str,
    unit: Option<&str>,
) -> Result<String> {
    let id = EntityType::Property.gen_id();
    conn.execute(
        "INSERT INTO properties (id, landlord_id, address, unit, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, landlord_id, address, unit, now()],
    )?;
    Ok(id)
}

// ============ Rental Applications ============

pub fn create_application(
    conn: &Connection,
    input: &CreateApplication,
) -> Result<RentalApplication> {
    let id = EntityType::Application.gen_id();
    let now = now();
    let history = serde_json::to_string(&input.residence_history)?;

    conn.execute(
        "INSERT INTO rental_applications (
            id, landlord_id, property_id, unit_id, status,
            applicant_name, applicant_email, date_of_birth, residence_history,
            credit_consent, reference_consent, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            &id,
            &input.landlord_id,
            &input.property_id,
            &input.unit_id,
            input.status.as_str(),
            &input.applicant_name,
            &input.applicant_email,
            &input.date_of_birth,
            &history,
            input.credit_consent,
            input.reference_consent,
            now,
        ],
    )?;

    Ok(RentalApplication {
        id,
        landlord_id: input.landlord_id.clone(),
        property_id: input.property_id.clone(),
        unit_id: input.unit_id.clone(),
        status: input.status,
        applicant_name: input.applicant_name.clone(),
        applicant_email: input.applicant_email.clone(),
        date_of_birth: input.date_of_birth.clone(),
        residence_history: input.residence_history.clone(),
        credit_consent: input.credit_consent,
        reference_consent: input.reference_consent,
        consent_version: None,
        consent_timestamp: None,
        consent_text_hash: None,
        screening_status: ScreeningStatus::Unpaid,
        screening_provider: None,
        screening_order_id: None,
        screening_paid_at: None,
        screening_result: None,
        screening_ai: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_application_by_id(conn: &Connection, id: &str) -> Result<Option<RentalApplication>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM rental_applications WHERE id = ?1",
            APPLICATION_COLS
        ),
        &[&id],
    )
}

/// Snapshot the consent payload supplied at checkout onto the application.
pub fn record_consent_snapshot(
    conn: &Connection,
    application_id: &str,
    consent: &ConsentPayload,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE rental_applications
         SET consent_version = ?1, consent_timestamp = ?2, consent_text_hash = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            &consent.version,
            consent.timestamp,
            &consent.text_hash,
            now(),
            application_id
        ],
    )?;
    Ok(affected > 0)
}

/// Advance the screening sub-state, enforcing forward-only transitions.
///
/// Compare-and-swap on the current status value: if a concurrent writer moved
/// the application first, this returns false and the caller's transition is
/// dropped. The screening core is the only writer of this column.
pub fn advance_screening_status(
    conn: &Connection,
    application_id: &str,
    next: ScreeningStatus,
) -> Result<bool> {
    let Some(app) = get_application_by_id(conn, application_id)? else {
        return Ok(false);
    };
    if !app.screening_status.can_advance_to(next) {
        return Ok(false);
    }
    let affected = conn.execute(
        "UPDATE rental_applications
         SET screening_status = ?1, updated_at = ?2
         WHERE id = ?3 AND screening_status = ?4",
        params![
            next.as_str(),
            now(),
            application_id,
            app.screening_status.as_str()
        ],
    )?;
    Ok(affected > 0)
}

/// Mark the application's screening paid. Runs inside the finalization
/// transaction; same CAS discipline as advance_screening_status.
pub fn mark_screening_paid(
    conn: &Connection,
    application_id: &str,
    order_id: &str,
    paid_at: i64,
) -> Result<bool> {
    let Some(app) = get_application_by_id(conn, application_id)? else {
        return Ok(false);
    };
    if !app.screening_status.can_advance_to(ScreeningStatus::Paid) {
        return Ok(false);
    }
    let affected = conn.execute(
        "UPDATE rental_applications
         SET screening_status = 'paid', screening_order_id = ?1, screening_paid_at = ?2, updated_at = ?3
         WHERE id = ?4 AND screening_status = ?5",
        params![
            order_id,
            paid_at,
            now(),
            application_id,
            app.screening_status.as_str()
        ],
    )?;
    Ok(affected > 0)
}

/// Attach the computed screening result and advance to complete.
pub fn set_screening_result(
    conn: &Connection,
    application_id: &str,
    provider: &str,
    result_json: &str,
    ai_json: Option<&str>,
) -> Result<bool> {
    let Some(app) = get_application_by_id(conn, application_id)? else {
        return Ok(false);
    };
    if !app
        .screening_status
        .can_advance_to(ScreeningStatus::Complete)
    {
        return Ok(false);
    }
    let affected = conn.execute(
        "UPDATE rental_applications
         SET screening_status = 'complete', screening_provider = ?1, screening_result = ?2,
             screening_ai = ?3, updated_at = ?4
         WHERE id = ?5 AND screening_status = ?6",
        params![
            provider,
            result_json,
            ai_json,
            now(),
            application_id,
            app.screening_status.as_str()
        ],
    )?;
    Ok(affected > 0)
}

/// Mark screening failed (permanent provider rejection).
pub fn mark_screening_failed(conn: &Connection, application_id: &str) -> Result<bool> {
    advance_screening_status(conn, application_id, ScreeningStatus::Failed)
}

// ============ Screening Orders ============

pub fn create_screening_order(
    conn: &Connection,
    input: &CreateScreeningOrder,
) -> Result<ScreeningOrder> {
    let id = EntityType::ScreeningOrder.gen_id();
    let reference_id = gen_order_reference();
    let now = now();
    let addons = serde_json::to_string(&input.addons)?;

    conn.execute(
        "INSERT INTO screening_orders (
            id, reference_id, application_id, landlord_id, property_id, unit_id,
            amount_cents, total_amount_cents, currency, screening_tier, addons, service_level,
            payment_status, finalized, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 'unpaid', 0, ?13)",
        params![
            &id,
            &reference_id,
            &input.application_id,
            &input.landlord_id,
            &input.property_id,
            &input.unit_id,
            input.amount_cents,
            input.total_amount_cents,
            &input.currency,
            &input.screening_tier,
            &addons,
            input.service_level.as_str(),
            now,
        ],
    )?;

    Ok(ScreeningOrder {
        id,
        reference_id: Some(reference_id),
        application_id: input.application_id.clone(),
        landlord_id: input.landlord_id.clone(),
        property_id: input.property_id.clone(),
        unit_id: input.unit_id.clone(),
        amount_cents: input.amount_cents,
        total_amount_cents: input.total_amount_cents,
        currency: input.currency.clone(),
        screening_tier: input.screening_tier.clone(),
        addons: input.addons.clone(),
        service_level: input.service_level,
        stripe_session_id: None,
        stripe_payment_intent_id: None,
        payment_status: "unpaid".to_string(),
        finalized: false,
        finalized_at: None,
        paid_at: None,
        last_stripe_event_id: None,
        created_at: now,
    })
}

pub fn get_screening_order_by_id(conn: &Connection, id: &str) -> Result<Option<ScreeningOrder>> {
    query_one(
        conn,
        &format!("SELECT {} FROM screening_orders WHERE id = ?1", ORDER_COLS),
        &[&id],
    )
}

pub fn get_order_by_session(conn: &Connection, session_id: &str) -> Result<Option<ScreeningOrder>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM screening_orders WHERE stripe_session_id = ?1 LIMIT 1",
            ORDER_COLS
        ),
        &[&session_id],
    )
}

pub fn get_order_by_payment_intent(
    conn: &Connection,
    payment_intent_id: &str,
) -> Result<Option<ScreeningOrder>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM screening_orders WHERE stripe_payment_intent_id = ?1 LIMIT 1",
            ORDER_COLS
        ),
        &[&payment_intent_id],
    )
}

/// Record the gateway checkout-session id once the session is created.
pub fn set_order_stripe_session(
    conn: &Connection,
    order_id: &str,
    session_id: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE screening_orders SET stripe_session_id = ?1 WHERE id = ?2",
        params![session_id, order_id],
    )?;
    Ok(affected > 0)
}

/// Atomically finalize an order, returning whether this call won the claim.
///
/// Compare-and-swap on `finalized = 0` so two concurrent deliveries cannot
/// both observe "not yet finalized". Correlation ids are backfilled with
/// COALESCE - existing values are never overwritten.
pub fn finalize_order(
    conn: &Connection,
    order_id: &str,
    event_id: &str,
    session_id: Option<&str>,
    payment_intent_id: Option<&str>,
    finalized_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE screening_orders
         SET payment_status = 'paid', finalized = 1, finalized_at = ?1, paid_at = ?1,
             last_stripe_event_id = ?2,
             stripe_session_id = COALESCE(stripe_session_id, ?3),
             stripe_payment_intent_id = COALESCE(stripe_payment_intent_id, ?4)
         WHERE id = ?5 AND finalized = 0",
        params![finalized_at, event_id, session_id, payment_intent_id, order_id],
    )?;
    Ok(affected > 0)
}

/// Backfill still-missing correlation ids on an already-finalized order.
/// Never touches paid_at / finalized_at / payment_status.
pub fn backfill_order_correlation(
    conn: &Connection,
    order_id: &str,
    session_id: Option<&str>,
    payment_intent_id: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE screening_orders
         SET stripe_session_id = COALESCE(stripe_session_id, ?1),
             stripe_payment_intent_id = COALESCE(stripe_payment_intent_id, ?2)
         WHERE id = ?3",
        params![session_id, payment_intent_id, order_id],
    )?;
    Ok(affected > 0)
}

// ============ Gateway Event Deduplication ============

/// Atomically record a gateway event, returning true if this is a new event.
/// Returns false if the event was already processed (webhook redelivery).
///
/// Uses INSERT OR IGNORE for atomicity - if the event_id already exists, the
/// insert is silently ignored and we return false.
pub fn try_record_gateway_event(
    conn: &Connection,
    event_id: &str,
    event_type: &str,
    order_id: Option<&str>,
    session_id: Option<&str>,
    payment_intent_id: Option<&str>,
    resolved: bool,
) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO gateway_events
            (event_id, event_type, order_id, session_id, payment_intent_id, resolved, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event_id,
            event_type,
            order_id,
            session_id,
            payment_intent_id,
            resolved,
            now()
        ],
    )?;
    Ok(affected > 0)
}

pub fn get_gateway_event(conn: &Connection, event_id: &str) -> Result<Option<GatewayEvent>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM gateway_events WHERE event_id = ?1",
            GATEWAY_EVENT_COLS
        ),
        &[&event_id],
    )
}

/// Purge old gateway events beyond the retention period.
/// These exist for redelivery dedupe; gateways retry for days, not months.
/// Returns the number of deleted records.
pub fn purge_old_gateway_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM gateway_events WHERE created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

// ============ Verified Screening Queue ============

/// Create the review work item for an order if none exists yet.
///
/// INSERT OR IGNORE against UNIQUE(order_id): returns Some(entry) only for
/// the call that actually inserted, so notification fires at most once even
/// when the result processor races a manual confirmation.
pub fn try_enqueue_verified_review(
    conn: &Connection,
    order: &ScreeningOrder,
    application: &RentalApplication,
) -> Result<Option<QueueEntry>> {
    let id = EntityType::QueueEntry.gen_id();
    let created_at = now();

    let affected = conn.execute(
        "INSERT OR IGNORE INTO verified_screening_queue
            (id, order_id, application_id, landlord_id, applicant_name, applicant_email,
             service_level, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)",
        params![
            &id,
            &order.id,
            &order.application_id,
            &order.landlord_id,
            &application.applicant_name,
            &application.applicant_email,
            order.service_level.as_str(),
            created_at,
        ],
    )?;

    if affected == 0 {
        return Ok(None);
    }

    Ok(Some(QueueEntry {
        id,
        order_id: order.id.clone(),
        application_id: order.application_id.clone(),
        landlord_id: order.landlord_id.clone(),
        applicant_name: application.applicant_name.clone(),
        applicant_email: application.applicant_email.clone(),
        service_level: order.service_level.as_str().to_string(),
        status: "pending".to_string(),
        notify_sent: false,
        notify_error: None,
        notified_at: None,
        created_at,
    }))
}

pub fn get_queue_entry_by_order(conn: &Connection, order_id: &str) -> Result<Option<QueueEntry>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM verified_screening_queue WHERE order_id = ?1",
            QUEUE_COLS
        ),
        &[&order_id],
    )
}

pub fn count_queue_entries_for_order(conn: &Connection, order_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM verified_screening_queue WHERE order_id = ?1",
        params![order_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Record the outcome of the single operator-notification attempt.
pub fn record_queue_notify_outcome(
    conn: &Connection,
    queue_id: &str,
    sent: bool,
    error: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE verified_screening_queue
         SET notify_sent = ?1, notify_error = ?2, notified_at = ?3
         WHERE id = ?4",
        params![sent, error, now(), queue_id],
    )?;
    Ok(())
}

// ============ Order Resolution ============

/// Locate the single order a webhook payload refers to.
///
/// The three correlation ids become known at different times (order_id is
/// ours and always present once created; session_id appears when checkout is
/// created; payment_intent_id only once the gateway attempts payment), so any
/// one webhook may carry only a subset. Most-specific key first.
pub fn resolve_order(
    conn: &Connection,
    order_id: Option<&str>,
    session_id: Option<&str>,
    payment_intent_id: Option<&str>,
) -> Result<Option<ScreeningOrder>> {
    if let Some(id) = order_id {
        if let Some(order) = get_screening_order_by_id(conn, id)? {
            return Ok(Some(order));
        }
    }
    if let Some(sid) = session_id {
        if let Some(order) = get_order_by_session(conn, sid)? {
            return Ok(Some(order));
        }
    }
    if let Some(pid) = payment_intent_id {
        if let Some(order) = get_order_by_payment_intent(conn, pid)? {
            return Ok(Some(order));
        }
    }
    Ok(None)
}

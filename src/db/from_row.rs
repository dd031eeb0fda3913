//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! This module provides a `FromRow` trait that models can implement to
//! define how they are constructed from database rows, plus helper functions
//! for common query patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Parse a TEXT column holding a JSON string array.
fn parse_string_list(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(col)?;
    serde_json::from_str(&raw).map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
///
/// Implementing this trait allows using the `query_one` and `query_all`
/// helper functions, reducing repetitive row mapping closures.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const LANDLORD_COLS: &str = "id, name, email, billing_plan, plan_status, stripe_customer_id, stripe_subscription_id, created_at, updated_at";

pub const APPLICATION_COLS: &str = "id, landlord_id, property_id, unit_id, status, applicant_name, applicant_email, date_of_birth, residence_history, credit_consent, reference_consent, consent_version, consent_timestamp, consent_text_hash, screening_status, screening_provider, screening_order_id, screening_paid_at, screening_result, screening_ai, created_at, updated_at";

pub const ORDER_COLS: &str = "id, reference_id, application_id, landlord_id, property_id, unit_id, amount_cents, total_amount_cents, currency, screening_tier, addons, service_level, stripe_session_id, stripe_payment_intent_id, payment_status, finalized, finalized_at, paid_at, last_stripe_event_id, created_at";

pub const GATEWAY_EVENT_COLS: &str =
    "event_id, event_type, order_id, session_id, payment_intent_id, resolved, created_at";

pub const QUEUE_COLS: &str = "id, order_id, application_id, landlord_id, applicant_name, applicant_email, service_level, status, notify_sent, notify_error, notified_at, created_at";

// ============ FromRow Implementations ============

impl FromRow for Landlord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Landlord {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            billing_plan: row.get(3)?,
            plan_status: row.get(4)?,
            stripe_customer_id: row.get(5)?,
            stripe_subscription_id: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl FromRow for RentalApplication {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RentalApplication {
            id: row.get(0)?,
            landlord_id: row.get(1)?,
            property_id: row.get(2)?,
            unit_id: row.get(3)?,
            status: parse_enum(row, 4, "status")?,
            applicant_name: row.get(5)?,
            applicant_email: row.get(6)?,
            date_of_birth: row.get(7)?,
            residence_history: parse_string_list(row, 8, "residence_history")?,
            credit_consent: row.get(9)?,
            reference_consent: row.get(10)?,
            consent_version: row.get(11)?,
            consent_timestamp: row.get(12)?,
            consent_text_hash: row.get(13)?,
            screening_status: parse_enum(row, 14, "screening_status")?,
            screening_provider: row.get(15)?,
            screening_order_id: row.get(16)?,
            screening_paid_at: row.get(17)?,
            screening_result: row.get(18)?,
            screening_ai: row.get(19)?,
            created_at: row.get(20)?,
            updated_at: row.get(21)?,
        })
    }
}

impl FromRow for ScreeningOrder {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ScreeningOrder {
            id: row.get(0)?,
            reference_id: row.get(1)?,
            application_id: row.get(2)?,
            landlord_id: row.get(3)?,
            property_id: row.get(4)?,
            unit_id: row.get(5)?,
            amount_cents: row.get(6)?,
            total_amount_cents: row.get(7)?,
            currency: row.get(8)?,
            screening_tier: row.get(9)?,
            addons: parse_string_list(row, 10, "addons")?,
            service_level: parse_enum(row, 11, "service_level")?,
            stripe_session_id: row.get(12)?,
            stripe_payment_intent_id: row.get(13)?,
            payment_status: row.get(14)?,
            finalized: row.get(15)?,
            finalized_at: row.get(16)?,
            paid_at: row.get(17)?,
            last_stripe_event_id: row.get(18)?,
            created_at: row.get(19)?,
        })
    }
}

impl FromRow for GatewayEvent {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(GatewayEvent {
            event_id: row.get(0)?,
            event_type: row.get(1)?,
            order_id: row.get(2)?,
            session_id: row.get(3)?,
            payment_intent_id: row.get(4)?,
            resolved: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for QueueEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(QueueEntry {
            id: row.get(0)?,
            order_id: row.get(1)?,
            application_id: row.get(2)?,
            landlord_id: row.get(3)?,
            applicant_name: row.get(4)?,
            applicant_email: row.get(5)?,
            service_level: row.get(6)?,
            status: row.get(7)?,
            notify_sent: row.get(8)?,
            notify_error: row.get(9)?,
            notified_at: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for ScreeningEvent {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ScreeningEvent {
            id: row.get(0)?,
            application_id: row.get(1)?,
            event_type: row.get(2)?,
            actor: row.get(3)?,
            meta: row.get(4)?,
            at: row.get(5)?,
        })
    }
}

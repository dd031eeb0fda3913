//! Exactly-once payment finalization.
//!
//! Gateways deliver payment notifications at least once, possibly out of
//! order, and the same purchase surfaces as several event shapes
//! (checkout-session completed, async payment succeeded, payment-intent
//! succeeded). This module turns all of that into one durable transition of a
//! screening order from unpaid to paid.
//!
//! Two independent guards run inside a single database transaction:
//! the per-event dedupe insert (same event redelivered) and the order-level
//! finalized flag (same purchase, different event). Two concurrent deliveries
//! cannot both observe "not yet finalized".

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};

/// Everything a payment-succeeded signal tells us about the purchase.
/// Any one webhook may carry only a subset of the correlation ids.
#[derive(Debug, Clone, Default)]
pub struct PaymentEventFacts {
    /// The gateway's own event id - the idempotency key. Must be non-empty.
    pub event_id: String,
    pub event_type: String,
    pub order_id: Option<String>,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub amount_total_cents: Option<i64>,
    pub currency: Option<String>,
    pub application_id: Option<String>,
    pub landlord_id: Option<String>,
}

/// Outcome of one finalization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// This exact event was already handled - pure no-op on redelivery.
    AlreadyProcessed,
    /// The order was finalized earlier by a different event; correlation ids
    /// were backfilled, timestamps untouched.
    AlreadyFinalized { order_id: String },
    /// First time this order was seen paid. Downstream processing must run.
    Finalized {
        order_id: String,
        application_id: String,
    },
    /// No order matches any correlation id. An unresolved gateway-event row
    /// was written so a human can diagnose the orphaned payment; later manual
    /// reconciliation can retry.
    OrderNotFound,
}

/// Apply a payment-succeeded signal to its screening order, exactly once.
///
/// The cross-table order lookup runs before the write transaction; the final
/// read and all writes of the order, the dedupe row, and the application's
/// screening state happen inside one transaction.
pub fn finalize(conn: &mut Connection, facts: &PaymentEventFacts) -> Result<FinalizeOutcome> {
    if facts.event_id.is_empty() {
        return Err(AppError::BadRequest("missing gateway event id".into()));
    }

    // Pre-fetch the order reference outside the transaction; only its id is
    // trusted past this point.
    let prefetched = queries::resolve_order(
        conn,
        facts.order_id.as_deref(),
        facts.session_id.as_deref(),
        facts.payment_intent_id.as_deref(),
    )?;

    let tx = conn.transaction()?;

    let order = match &prefetched {
        // Re-read inside the transaction: the pre-fetched snapshot may be
        // stale if a concurrent delivery finalized the order in between.
        Some(o) => queries::get_screening_order_by_id(&tx, &o.id)?,
        None => None,
    };

    let outcome = match order {
        None => {
            let recorded = queries::try_record_gateway_event(
                &tx,
                &facts.event_id,
                &facts.event_type,
                None,
                facts.session_id.as_deref(),
                facts.payment_intent_id.as_deref(),
                false,
            )?;
            if !recorded {
                // Redelivery of an event we already recorded as unresolved.
                return Ok(FinalizeOutcome::AlreadyProcessed);
            }
            FinalizeOutcome::OrderNotFound
        }
        Some(order) => {
            let recorded = queries::try_record_gateway_event(
                &tx,
                &facts.event_id,
                &facts.event_type,
                Some(order.id.as_str()),
                facts.session_id.as_deref(),
                facts.payment_intent_id.as_deref(),
                true,
            )?;
            if !recorded {
                return Ok(FinalizeOutcome::AlreadyProcessed);
            }

            if order.finalized {
                // Normal case of receiving both checkout.session.completed
                // and payment_intent.succeeded for the same purchase.
                queries::backfill_order_correlation(
                    &tx,
                    &order.id,
                    facts.session_id.as_deref(),
                    facts.payment_intent_id.as_deref(),
                )?;
                FinalizeOutcome::AlreadyFinalized {
                    order_id: order.id.clone(),
                }
            } else {
                let now = chrono::Utc::now().timestamp();
                let claimed = queries::finalize_order(
                    &tx,
                    &order.id,
                    &facts.event_id,
                    facts.session_id.as_deref(),
                    facts.payment_intent_id.as_deref(),
                    now,
                )?;
                if !claimed {
                    // CAS lost within our own transaction cannot happen under
                    // SQLite's single-writer model; treat as already done.
                    FinalizeOutcome::AlreadyFinalized {
                        order_id: order.id.clone(),
                    }
                } else {
                    if !queries::mark_screening_paid(&tx, &order.application_id, &order.id, now)? {
                        tracing::warn!(
                            "Application {} screening status did not advance to paid (order {})",
                            order.application_id,
                            order.id
                        );
                    }
                    FinalizeOutcome::Finalized {
                        order_id: order.id.clone(),
                        application_id: order.application_id.clone(),
                    }
                }
            }
        }
    };

    tx.commit()?;
    Ok(outcome)
}

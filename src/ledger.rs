//! Append-only screening event ledger.
//!
//! Every screening lifecycle transition is recorded here, keyed by
//! application, for support debugging and idempotency inspection. The ledger
//! lives in its own database file (WAL mode, see `db::init_ledger_db`) so its
//! append growth never competes with the transactional store.

use rusqlite::{params, Connection};

use crate::db::{query_all, DbPool};
use crate::error::Result;
use crate::id::EntityType;
use crate::models::{ScreeningEvent, ScreeningEventType};

const SCREENING_EVENT_COLS: &str = "id, application_id, event_type, actor, meta, at";

/// Append one lifecycle event.
pub fn record(
    conn: &Connection,
    application_id: &str,
    event_type: ScreeningEventType,
    actor: &str,
    meta: Option<&serde_json::Value>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO screening_events (id, application_id, event_type, actor, meta, at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            EntityType::LedgerEvent.gen_id(),
            application_id,
            event_type.as_str(),
            actor,
            meta.map(|m| m.to_string()),
            chrono::Utc::now().timestamp(),
        ],
    )?;
    Ok(())
}

/// Best-effort ledger append from request paths: failures are logged, never
/// propagated. The ledger is a diagnostic record, not transactional state.
pub fn record_or_log(
    pool: &DbPool,
    application_id: &str,
    event_type: ScreeningEventType,
    actor: &str,
    meta: Option<&serde_json::Value>,
) {
    let result = pool
        .get()
        .map_err(crate::error::AppError::from)
        .and_then(|conn| record(&conn, application_id, event_type, actor, meta));
    if let Err(e) = result {
        tracing::warn!(
            "Failed to record {} ledger event for {}: {}",
            event_type.as_str(),
            application_id,
            e
        );
    }
}

/// All events for one application, oldest first.
pub fn list_for_application(conn: &Connection, application_id: &str) -> Result<Vec<ScreeningEvent>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM screening_events WHERE application_id = ?1 ORDER BY at, id",
            SCREENING_EVENT_COLS
        ),
        &[&application_id],
    )
}

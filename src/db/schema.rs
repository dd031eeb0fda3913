use rusqlite::Connection;

/// Initialize the main database schema (everything except the event ledger)
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Landlords (accounts; billing fields mirror the payment gateway)
        CREATE TABLE IF NOT EXISTS landlords (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            billing_plan TEXT,
            plan_status TEXT,
            stripe_customer_id TEXT,
            stripe_subscription_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_landlords_stripe_customer ON landlords(stripe_customer_id);

        -- Properties (linkage target for orders and applications)
        CREATE TABLE IF NOT EXISTS properties (
            id TEXT PRIMARY KEY,
            landlord_id TEXT NOT NULL REFERENCES landlords(id) ON DELETE CASCADE,
            address TEXT NOT NULL,
            unit TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_properties_landlord ON properties(landlord_id);

        -- Rental applications with embedded screening sub-state.
        -- screening_status moves forward only; enforced by the CAS update in
        -- queries::advance_screening_status, the single writer of the column.
        CREATE TABLE IF NOT EXISTS rental_applications (
            id TEXT PRIMARY KEY,
            landlord_id TEXT NOT NULL REFERENCES landlords(id) ON DELETE CASCADE,
            property_id TEXT REFERENCES properties(id) ON DELETE SET NULL,
            unit_id TEXT,
            status TEXT NOT NULL CHECK (status IN ('draft', 'submitted', 'under_review', 'approved', 'declined', 'withdrawn')),
            applicant_name TEXT NOT NULL,
            applicant_email TEXT NOT NULL,
            date_of_birth TEXT,
            residence_history TEXT NOT NULL DEFAULT '[]',
            credit_consent INTEGER NOT NULL DEFAULT 0,
            reference_consent INTEGER NOT NULL DEFAULT 0,
            consent_version TEXT,
            consent_timestamp INTEGER,
            consent_text_hash TEXT,
            screening_status TEXT NOT NULL DEFAULT 'unpaid'
                CHECK (screening_status IN ('unpaid', 'ineligible', 'pending', 'paid', 'complete', 'failed')),
            screening_provider TEXT,
            screening_order_id TEXT,
            screening_paid_at INTEGER,
            screening_result TEXT,
            screening_ai TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_applications_landlord ON rental_applications(landlord_id);
        CREATE INDEX IF NOT EXISTS idx_applications_property ON rental_applications(property_id);

        -- Screening orders (one per purchase attempt, never deleted).
        -- stripe_session_id / stripe_payment_intent_id are backfilled as the
        -- gateway reveals them; each is a resolver fallback key.
        CREATE TABLE IF NOT EXISTS screening_orders (
            id TEXT PRIMARY KEY,
            reference_id TEXT,
            application_id TEXT NOT NULL REFERENCES rental_applications(id) ON DELETE CASCADE,
            landlord_id TEXT NOT NULL,
            property_id TEXT,
            unit_id TEXT,
            amount_cents INTEGER NOT NULL,
            total_amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            screening_tier TEXT NOT NULL,
            addons TEXT NOT NULL DEFAULT '[]',
            service_level TEXT NOT NULL CHECK (service_level IN ('self_serve', 'verified', 'verified_ai')),
            stripe_session_id TEXT,
            stripe_payment_intent_id TEXT,
            payment_status TEXT NOT NULL DEFAULT 'unpaid' CHECK (payment_status IN ('unpaid', 'paid')),
            finalized INTEGER NOT NULL DEFAULT 0,
            finalized_at INTEGER,
            paid_at INTEGER,
            last_stripe_event_id TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_orders_application ON screening_orders(application_id);
        CREATE INDEX IF NOT EXISTS idx_orders_session ON screening_orders(stripe_session_id);
        CREATE INDEX IF NOT EXISTS idx_orders_payment_intent ON screening_orders(stripe_payment_intent_id);

        -- Gateway events (webhook dedupe ledger).
        -- Row exists iff the event was durably accepted; INSERT OR IGNORE on
        -- the primary key is the atomic replay check.
        CREATE TABLE IF NOT EXISTS gateway_events (
            event_id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            order_id TEXT,
            session_id TEXT,
            payment_intent_id TEXT,
            resolved INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_gateway_events_order ON gateway_events(order_id);

        -- Verified screening review queue (at most one entry per order)
        CREATE TABLE IF NOT EXISTS verified_screening_queue (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL UNIQUE REFERENCES screening_orders(id) ON DELETE CASCADE,
            application_id TEXT NOT NULL,
            landlord_id TEXT NOT NULL,
            applicant_name TEXT NOT NULL,
            applicant_email TEXT NOT NULL,
            service_level TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'in_review', 'done')),
            notify_sent INTEGER NOT NULL DEFAULT 0,
            notify_error TEXT,
            notified_at INTEGER,
            created_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Initialize the event-ledger database schema (separate DB file)
/// Optimized for append-only workload with WAL mode
pub fn init_ledger_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode: writes are sequential appends, much faster for append-only workloads
    // synchronous=NORMAL: safe with WAL, faster than FULL
    // journal_size_limit: prevent WAL from growing indefinitely
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;

        CREATE TABLE IF NOT EXISTS screening_events (
            id TEXT PRIMARY KEY,
            application_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            actor TEXT NOT NULL,
            meta TEXT,
            at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_screening_events_application ON screening_events(application_id, at);
        CREATE INDEX IF NOT EXISTS idx_screening_events_type ON screening_events(event_type);
        "#,
    )?;
    Ok(())
}

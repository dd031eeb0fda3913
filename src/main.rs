use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rentfolio::config::Config;
use rentfolio::db::{create_pool, init_db, init_ledger_db, queries, AppState};
use rentfolio::handlers;
use rentfolio::models::{ApplicationStatus, CreateApplication, CreateLandlord};
use rentfolio::notify::OpsNotifier;
use rentfolio::payments::StripeClient;
use rentfolio::screening::redirect::RedirectPolicy;
use rentfolio::screening::result::{HashRiskProvider, ProviderHealth};

#[derive(Parser, Debug)]
#[command(name = "rentfolio")]
#[command(about = "Rental-property screening backend")]
struct Cli {
    /// Seed the database with dev data (landlord, property, application)
    #[arg(long)]
    seed: bool,
}

/// Seeds the database with dev data for testing checkout flows locally.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state
        .db
        .get()
        .expect("Failed to get db connection for seeding");

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM landlords", [], |row| row.get(0))
        .expect("Failed to count landlords");
    if existing > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let landlord = queries::create_landlord(
        &conn,
        &CreateLandlord {
            name: "Dev Landlord".to_string(),
            email: "dev@rentfolio.local".to_string(),
            stripe_customer_id: None,
        },
    )
    .expect("Failed to create dev landlord");

    let property_id = queries::create_property(&conn, &landlord.id, "100 Main St", Some("2B"))
        .expect("Failed to create dev property");

    let application = queries::create_application(
        &conn,
        &CreateApplication {
            landlord_id: landlord.id.clone(),
            property_id: Some(property_id.clone()),
            unit_id: None,
            status: ApplicationStatus::Submitted,
            applicant_name: "Dev Applicant".to_string(),
            applicant_email: "applicant@rentfolio.local".to_string(),
            date_of_birth: Some("1990-01-15".to_string()),
            residence_history: vec!["42 Prior Ave, Springfield".to_string()],
            credit_consent: true,
            reference_consent: true,
        },
    )
    .expect("Failed to create dev application");

    tracing::info!("Dev data seeded");

    // Copy-paste friendly output for local API clients
    println!();
    println!("--- COPY FROM HERE ---");
    println!("  landlord_id: {}", landlord.id);
    println!("  property_id: {}", property_id);
    println!("  application_id: {}", application.id);
    println!("--- END COPY ---");
    println!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentfolio=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    let ledger_pool =
        create_pool(&config.ledger_database_path).expect("Failed to create ledger database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }
    {
        let conn = ledger_pool.get().expect("Failed to get ledger connection");
        init_ledger_db(&conn).expect("Failed to initialize ledger database");
    }

    let stripe = match (&config.stripe_secret_key, &config.stripe_webhook_secret) {
        (Some(secret), Some(webhook)) => Some(StripeClient::new(secret, webhook)),
        _ => {
            tracing::warn!(
                "Stripe not configured - checkout and webhook endpoints will answer stripe_not_configured"
            );
            None
        }
    };

    let state = AppState {
        db: db_pool,
        ledger: ledger_pool,
        base_url: config.base_url.clone(),
        consent_version: config.consent_version.clone(),
        report_secret: config.report_secret.clone(),
        stripe,
        redirects: RedirectPolicy::new(
            &config.frontend_origin,
            config.allowed_redirect_origins.clone(),
            config.dev_mode,
        ),
        notifier: OpsNotifier::new(config.ops_notify_url.clone()),
        provider: Arc::new(HashRiskProvider),
        health: ProviderHealth::new(),
    };

    // Purge expired gateway events on startup (0 = never purge)
    if config.gateway_event_retention_days > 0 {
        let conn = state.db.get().expect("Failed to get connection for purge");
        match queries::purge_old_gateway_events(&conn, config.gateway_event_retention_days) {
            Ok(count) if count > 0 => {
                tracing::info!(
                    "Purged {} gateway events older than {} days",
                    count,
                    config.gateway_event_retention_days
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to purge old gateway events: {}", e);
            }
        }
    }

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set RENTFOLIO_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        .merge(handlers::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Rentfolio server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

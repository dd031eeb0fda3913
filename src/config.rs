use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub ledger_database_path: String,
    pub base_url: String,
    /// Origin the tenant/landlord UI is served from; bare redirect paths
    /// resolve against this.
    pub frontend_origin: String,
    /// Extra origins allowed as absolute redirect targets (production domains).
    pub allowed_redirect_origins: Vec<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    /// Operations-staff notification webhook (verified screening reviews).
    pub ops_notify_url: Option<String>,
    /// Current consent-text version; checkout requires an exact match.
    pub consent_version: String,
    /// Secret for signing time-limited report download URLs.
    pub report_secret: String,
    /// Retention for the gateway-event dedupe ledger. Gateways redeliver for
    /// days, not months, so old rows are safe to drop.
    pub gateway_event_retention_days: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("RENTFOLIO_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let frontend_origin = env::var("FRONTEND_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let allowed_redirect_origins = env::var("ALLOWED_REDIRECT_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "rentfolio.db".to_string()),
            ledger_database_path: env::var("LEDGER_DATABASE_PATH")
                .unwrap_or_else(|_| "rentfolio_ledger.db".to_string()),
            base_url,
            frontend_origin,
            allowed_redirect_origins,
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").ok(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
            ops_notify_url: env::var("OPS_NOTIFY_URL").ok(),
            consent_version: env::var("CONSENT_TEXT_VERSION")
                .unwrap_or_else(|_| "2025-06".to_string()),
            report_secret: env::var("REPORT_URL_SECRET")
                .unwrap_or_else(|_| "dev-report-secret".to_string()),
            gateway_event_retention_days: env::var("GATEWAY_EVENT_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

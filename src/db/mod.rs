mod from_row;
pub mod queries;
mod schema;

pub use from_row::{query_all, query_one, FromRow};
pub use schema::{init_db, init_ledger_db};

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::notify::OpsNotifier;
use crate::payments::StripeClient;
use crate::screening::redirect::RedirectPolicy;
use crate::screening::result::{ProviderHealth, ResultProvider};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding database pools, payment configuration, and the
/// injected screening collaborators.
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (orders, applications, landlords, queue)
    pub db: DbPool,
    /// Event-ledger database pool (separate file to isolate append growth)
    pub ledger: DbPool,
    /// Base URL for signed report links (e.g. https://api.rentfolio.app)
    pub base_url: String,
    /// Current consent-text version; checkout requires an exact match
    pub consent_version: String,
    /// Secret for signing time-limited report download URLs
    pub report_secret: String,
    /// None means checkout/webhooks answer `stripe_not_configured`
    pub stripe: Option<StripeClient>,
    pub redirects: RedirectPolicy,
    pub notifier: OpsNotifier,
    /// Screening-result provider (stub heuristic in this deployment)
    pub provider: Arc<dyn ResultProvider>,
    /// Injected health tracker for provider failures
    pub health: ProviderHealth,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}

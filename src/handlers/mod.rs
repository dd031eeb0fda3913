pub mod checkout;
pub mod confirm;
pub mod orders;
pub mod webhooks;

use axum::Router;

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(webhooks::router())
        .merge(checkout::router())
        .merge(confirm::router())
        .merge(orders::router())
}

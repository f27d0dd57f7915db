use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod cron;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod seller;

// Build the API router without binding state; it is provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/seller", seller::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
        .nest("/cron", cron::router())
}

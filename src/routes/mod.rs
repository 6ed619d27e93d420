use std::sync::Arc;

use axum::{Router, routing::get};

use crate::db::Database;

mod clients;
mod invoices;
mod stats;

/// All API routes, mounted under `/api`. State is attached by the caller.
pub fn router() -> Router<Arc<Database>> {
    Router::new()
        .nest("/api/clients", clients::router())
        .nest("/api/invoices", invoices::router())
        .route("/api/stats", get(stats::get_stats))
}

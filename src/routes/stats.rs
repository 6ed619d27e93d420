use std::sync::Arc;

use axum::{Json, extract::State};

use crate::db::Database;
use crate::error::ApiError;
use crate::models::DashboardStats;

pub async fn get_stats(
    State(db): State<Arc<Database>>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(db.stats().await?))
}

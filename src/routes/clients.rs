use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use crate::db::Database;
use crate::error::ApiError;
use crate::models::{Client, ClientUpdate, NewClient};

pub fn router() -> Router<Arc<Database>> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route(
            "/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
}

async fn list_clients(State(db): State<Arc<Database>>) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(db.list_clients().await?))
}

async fn get_client(
    State(db): State<Arc<Database>>,
    Path(id): Path<i64>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(db.get_client(id).await?))
}

async fn create_client(
    State(db): State<Arc<Database>>,
    Json(data): Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = db.create_client(data).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn update_client(
    State(db): State<Arc<Database>>,
    Path(id): Path<i64>,
    Json(data): Json<ClientUpdate>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(db.update_client(id, data).await?))
}

async fn delete_client(
    State(db): State<Arc<Database>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    db.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

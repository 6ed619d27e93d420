use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Store(e) => {
                error!("store failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
            ApiError::Pdf(e) => {
                error!("pdf failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "pdf_error")
            }
        };

        (
            status,
            Json(json!({
                "error": code,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use crate::db::Database;
use crate::error::ApiError;
use crate::invoice_gen;
use crate::models::{InvoiceDetail, InvoiceUpdate, NewInvoice};

pub fn router() -> Router<Arc<Database>> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route(
            "/:id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/:id/pdf", get(download_pdf))
}

async fn list_invoices(
    State(db): State<Arc<Database>>,
) -> Result<Json<Vec<InvoiceDetail>>, ApiError> {
    Ok(Json(db.list_invoices().await?))
}

async fn get_invoice(
    State(db): State<Arc<Database>>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceDetail>, ApiError> {
    Ok(Json(db.get_invoice(id).await?))
}

async fn create_invoice(
    State(db): State<Arc<Database>>,
    Json(data): Json<NewInvoice>,
) -> Result<(StatusCode, Json<InvoiceDetail>), ApiError> {
    let invoice = db.create_invoice(data).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn update_invoice(
    State(db): State<Arc<Database>>,
    Path(id): Path<i64>,
    Json(data): Json<InvoiceUpdate>,
) -> Result<Json<InvoiceDetail>, ApiError> {
    Ok(Json(db.update_invoice(id, data).await?))
}

async fn delete_invoice(
    State(db): State<Arc<Database>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    db.delete_invoice(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_pdf(
    State(db): State<Arc<Database>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = db.get_invoice(id).await?;
    let bytes = invoice_gen::render_invoice(&detail)?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"invoice_{}.pdf\"",
                detail.invoice.invoice_number
            ),
        ),
    ];

    Ok((headers, bytes))
}

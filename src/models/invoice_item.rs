use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Always quantity * unit_price, computed at write time.
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Client, InvoiceItem, NewInvoiceItem};

#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub client_id: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

/// An invoice hydrated with its client and line items, the shape
/// returned by every invoice read and fed to the PDF renderer.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client: Client,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Deserialize)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub client_id: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default = "default_status")]
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub tax_rate: f64,
    pub items: Vec<NewInvoiceItem>,
}

fn default_status() -> InvoiceStatus {
    InvoiceStatus::Pending
}

/// Partial update. Supplying `items` replaces the whole item set and
/// recomputes totals; omitting it leaves totals untouched.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceUpdate {
    pub invoice_number: Option<String>,
    pub client_id: Option<i64>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
    pub notes: Option<String>,
    pub tax_rate: Option<f64>,
    pub items: Option<Vec<NewInvoiceItem>>,
}

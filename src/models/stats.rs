use serde::Serialize;

/// Dashboard aggregates over the whole invoice collection.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_invoices: i64,
    pub total_clients: i64,
    pub pending_invoices: i64,
    pub paid_invoices: i64,
    /// Sum of `total` over paid invoices, rounded to 2 decimals.
    pub total_revenue: f64,
    /// Sum of `total` over pending invoices, rounded to 2 decimals.
    pub pending_amount: f64,
}

use crate::models::NewInvoiceItem;

/// Subtotal and total for a set of line items at a given tax rate.
///
/// `subtotal` is the sum of `quantity * unit_price` across items and
/// `total` applies the tax rate as a percentage on top. Negative
/// quantities or prices flow through arithmetically; nothing here
/// validates the inputs.
pub fn compute_totals(items: &[NewInvoiceItem], tax_rate: f64) -> (f64, f64) {
    let subtotal: f64 = items.iter().map(|i| i.quantity * i.unit_price).sum();
    let total = subtotal * (1.0 + tax_rate / 100.0);
    (subtotal, total)
}

/// Line amount for a single item.
pub fn line_amount(item: &NewInvoiceItem) -> f64 {
    item.quantity * item.unit_price
}

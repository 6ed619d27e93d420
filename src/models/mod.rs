mod client;
mod invoice;
mod invoice_item;
mod stats;

pub use client::{Client, ClientUpdate, NewClient};
pub use invoice::{Invoice, InvoiceDetail, InvoiceStatus, InvoiceUpdate, NewInvoice};
pub use invoice_item::{InvoiceItem, NewInvoiceItem};
pub use stats::DashboardStats;

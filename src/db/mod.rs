use std::str::FromStr;

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    Client, ClientUpdate, DashboardStats, Invoice, InvoiceDetail, InvoiceItem, InvoiceStatus,
    InvoiceUpdate, NewClient, NewInvoice,
};
use crate::totals;

/// Repository facade over the SQLite connection pool. Every mutation
/// that touches more than one row runs inside a single transaction.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new Database instance with a connection pool.
    pub async fn new(config: &Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(config.database_url())?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Client operations

    pub async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    pub async fn get_client(&self, id: i64) -> Result<Client, ApiError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("client"))?;

        Ok(client)
    }

    pub async fn create_client(&self, data: NewClient) -> Result<Client, ApiError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO clients (name, email, address, phone, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.address)
        .bind(&data.phone)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        self.get_client(id).await
    }

    pub async fn update_client(&self, id: i64, data: ClientUpdate) -> Result<Client, ApiError> {
        let current = self.get_client(id).await?;

        sqlx::query(
            r#"
            UPDATE clients
            SET name = ?, email = ?, address = ?, phone = ?
            WHERE id = ?
            "#,
        )
        .bind(data.name.unwrap_or(current.name))
        .bind(data.email.unwrap_or(current.email))
        .bind(data.address.or(current.address))
        .bind(data.phone.or(current.phone))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_client(id).await
    }

    /// Deleting a client that still has invoices is rejected; the
    /// invoices must be deleted first.
    pub async fn delete_client(&self, id: i64) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ApiError::NotFound("client"));
        }

        let invoice_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE client_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if invoice_count > 0 {
            return Err(ApiError::validation(format!(
                "client {id} still has {invoice_count} invoice(s)"
            )));
        }

        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    // Invoice operations

    pub async fn list_invoices(&self) -> Result<Vec<InvoiceDetail>, ApiError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            details.push(self.hydrate(invoice).await?);
        }

        Ok(details)
    }

    pub async fn get_invoice(&self, id: i64) -> Result<InvoiceDetail, ApiError> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("invoice"))?;

        self.hydrate(invoice).await
    }

    pub async fn create_invoice(&self, data: NewInvoice) -> Result<InvoiceDetail, ApiError> {
        let mut tx = self.pool.begin().await?;

        let duplicate =
            sqlx::query_scalar::<_, i64>("SELECT id FROM invoices WHERE invoice_number = ?")
                .bind(&data.invoice_number)
                .fetch_optional(&mut *tx)
                .await?;
        if duplicate.is_some() {
            return Err(ApiError::validation(format!(
                "invoice_number '{}' already exists",
                data.invoice_number
            )));
        }

        let client_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM clients WHERE id = ?")
            .bind(data.client_id)
            .fetch_optional(&mut *tx)
            .await?;
        if client_exists.is_none() {
            return Err(ApiError::validation(format!(
                "client_id {} does not exist",
                data.client_id
            )));
        }

        let (subtotal, total) = totals::compute_totals(&data.items, data.tax_rate);

        let invoice_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO invoices
                (invoice_number, client_id, issue_date, due_date, status,
                 notes, subtotal, tax_rate, total, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&data.invoice_number)
        .bind(data.client_id)
        .bind(data.issue_date)
        .bind(data.due_date)
        .bind(data.status)
        .bind(&data.notes)
        .bind(subtotal)
        .bind(data.tax_rate)
        .bind(total)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for item in &data.items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (invoice_id, description, quantity, unit_price, amount)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(invoice_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(totals::line_amount(item))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(invoice_id, invoice_number = %data.invoice_number, "invoice created");

        self.get_invoice(invoice_id).await
    }

    /// Partial update. When `items` is supplied the prior item set is
    /// deleted wholesale, replaced, and subtotal/total are recomputed
    /// against the effective tax rate. When `items` is omitted the
    /// stored totals stay as they are, even if `tax_rate` changed.
    pub async fn update_invoice(
        &self,
        id: i64,
        data: InvoiceUpdate,
    ) -> Result<InvoiceDetail, ApiError> {
        let current = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("invoice"))?;

        let mut tx = self.pool.begin().await?;

        let tax_rate = data.tax_rate.unwrap_or(current.tax_rate);
        let (subtotal, total) = match &data.items {
            Some(items) => totals::compute_totals(items, tax_rate),
            None => (current.subtotal, current.total),
        };

        if let Some(items) = &data.items {
            sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for item in items {
                sqlx::query(
                    r#"
                    INSERT INTO invoice_items (invoice_id, description, quantity, unit_price, amount)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id)
                .bind(&item.description)
                .bind(item.quantity)
                .bind(item.unit_price)
                .bind(totals::line_amount(item))
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r#"
            UPDATE invoices
            SET invoice_number = ?, client_id = ?, issue_date = ?, due_date = ?,
                status = ?, notes = ?, subtotal = ?, tax_rate = ?, total = ?
            WHERE id = ?
            "#,
        )
        .bind(data.invoice_number.unwrap_or(current.invoice_number))
        .bind(data.client_id.unwrap_or(current.client_id))
        .bind(data.issue_date.unwrap_or(current.issue_date))
        .bind(data.due_date.unwrap_or(current.due_date))
        .bind(data.status.unwrap_or(current.status))
        .bind(data.notes.or(current.notes))
        .bind(subtotal)
        .bind(tax_rate)
        .bind(total)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_invoice(id).await
    }

    /// Removes an invoice and all of its items in one transaction.
    pub async fn delete_invoice(&self, id: i64) -> Result<(), ApiError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(ApiError::NotFound("invoice"));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(invoice_id = id, "invoice deleted");

        Ok(())
    }

    // Stats

    pub async fn stats(&self) -> Result<DashboardStats, ApiError> {
        let total_invoices = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;

        let total_clients = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;

        let pending_invoices = self.count_by_status(InvoiceStatus::Pending).await?;
        let paid_invoices = self.count_by_status(InvoiceStatus::Paid).await?;

        let total_revenue = self.sum_totals_by_status(InvoiceStatus::Paid).await?;
        let pending_amount = self.sum_totals_by_status(InvoiceStatus::Pending).await?;

        Ok(DashboardStats {
            total_invoices,
            total_clients,
            pending_invoices,
            paid_invoices,
            total_revenue: round2(total_revenue),
            pending_amount: round2(pending_amount),
        })
    }

    async fn count_by_status(&self, status: InvoiceStatus) -> Result<i64, ApiError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE status = ?")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn sum_totals_by_status(&self, status: InvoiceStatus) -> Result<f64, ApiError> {
        // SUM of an empty set is NULL, and a bare 0 would come back as an
        // INTEGER that does not decode into f64.
        let sum = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(total), 0.0) FROM invoices WHERE status = ?",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    async fn hydrate(&self, invoice: Invoice) -> Result<InvoiceDetail, ApiError> {
        let client = self.get_client(invoice.client_id).await?;

        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ? ORDER BY id ASC",
        )
        .bind(invoice.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(InvoiceDetail {
            invoice,
            client,
            items,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Initialize the database connection pool and run migrations.
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;

    sqlx::migrate!().run(db.get_pool()).await?;

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewInvoiceItem;
    use chrono::NaiveDate;

    // A single connection keeps every query on the same in-memory DB.
    async fn test_db() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");

        sqlx::migrate!().run(&pool).await.expect("migrations");

        Database { pool }
    }

    fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            address: Some("12 Main St".to_string()),
            phone: None,
        }
    }

    fn item(description: &str, quantity: f64, unit_price: f64) -> NewInvoiceItem {
        NewInvoiceItem {
            description: description.to_string(),
            quantity,
            unit_price,
        }
    }

    fn new_invoice(number: &str, client_id: i64, items: Vec<NewInvoiceItem>) -> NewInvoice {
        NewInvoice {
            invoice_number: number.to_string(),
            client_id,
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            status: InvoiceStatus::Pending,
            notes: None,
            tax_rate: 0.0,
            items,
        }
    }

    #[tokio::test]
    async fn client_roundtrip() {
        let db = test_db().await;

        let created = db.create_client(new_client("acme")).await.unwrap();
        let fetched = db.get_client(created.id).await.unwrap();

        assert_eq!(fetched.name, "acme");
        assert_eq!(fetched.email, "acme@example.com");
        assert_eq!(fetched.phone, None);
    }

    #[tokio::test]
    async fn update_client_is_partial() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();

        let updated = db
            .update_client(
                client.id,
                ClientUpdate {
                    phone: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "acme");
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
    }

    #[tokio::test]
    async fn create_invoice_computes_totals() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();

        let mut data = new_invoice(
            "INV-001",
            client.id,
            vec![item("design", 2.0, 50.0), item("hosting", 1.0, 30.0)],
        );
        data.tax_rate = 10.0;

        let detail = db.create_invoice(data).await.unwrap();

        assert_eq!(detail.invoice.subtotal, 130.0);
        assert!((detail.invoice.total - 143.0).abs() < 1e-9);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].amount, 100.0);
        assert_eq!(detail.client.id, client.id);
    }

    #[tokio::test]
    async fn duplicate_invoice_number_is_rejected() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();

        db.create_invoice(new_invoice("INV-001", client.id, vec![]))
            .await
            .unwrap();
        let err = db
            .create_invoice(new_invoice("INV-001", client.id, vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_client_is_rejected() {
        let db = test_db().await;

        let err = db
            .create_invoice(new_invoice("INV-001", 999, vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn update_replaces_items_and_recomputes() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();
        let created = db
            .create_invoice(new_invoice(
                "INV-001",
                client.id,
                vec![item("old", 1.0, 10.0)],
            ))
            .await
            .unwrap();

        let updated = db
            .update_invoice(
                created.invoice.id,
                InvoiceUpdate {
                    items: Some(vec![item("new", 3.0, 20.0)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].description, "new");
        assert_eq!(updated.invoice.subtotal, 60.0);
        assert_eq!(updated.invoice.total, 60.0);
    }

    #[tokio::test]
    async fn tax_rate_change_alone_leaves_totals_stale() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();
        let created = db
            .create_invoice(new_invoice(
                "INV-001",
                client.id,
                vec![item("work", 1.0, 100.0)],
            ))
            .await
            .unwrap();

        let updated = db
            .update_invoice(
                created.invoice.id,
                InvoiceUpdate {
                    tax_rate: Some(25.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.invoice.tax_rate, 25.0);
        assert_eq!(updated.invoice.subtotal, 100.0);
        assert_eq!(updated.invoice.total, 100.0);
    }

    #[tokio::test]
    async fn delete_invoice_cascades_to_items() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();
        let created = db
            .create_invoice(new_invoice(
                "INV-001",
                client.id,
                vec![item("work", 1.0, 10.0), item("more", 2.0, 5.0)],
            ))
            .await
            .unwrap();

        db.delete_invoice(created.invoice.id).await.unwrap();

        let err = db.get_invoice(created.invoice.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let orphans =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoice_items WHERE invoice_id = ?")
                .bind(created.invoice.id)
                .fetch_one(db.get_pool())
                .await
                .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn delete_missing_invoice_is_not_found() {
        let db = test_db().await;

        let err = db.delete_invoice(42).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_invoices_is_newest_first() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();

        db.create_invoice(new_invoice("INV-001", client.id, vec![]))
            .await
            .unwrap();
        db.create_invoice(new_invoice("INV-002", client.id, vec![]))
            .await
            .unwrap();

        let invoices = db.list_invoices().await.unwrap();
        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[0].invoice.invoice_number, "INV-002");
        assert_eq!(invoices[1].invoice.invoice_number, "INV-001");
    }

    #[tokio::test]
    async fn delete_client_with_invoices_is_rejected() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();
        let created = db
            .create_invoice(new_invoice("INV-001", client.id, vec![]))
            .await
            .unwrap();

        let err = db.delete_client(client.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        db.delete_invoice(created.invoice.id).await.unwrap();
        db.delete_client(client.id).await.unwrap();

        let err = db.get_client(client.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_missing_client_is_not_found() {
        let db = test_db().await;

        let err = db.delete_client(42).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn stats_aggregate_by_status() {
        let db = test_db().await;
        let client = db.create_client(new_client("acme")).await.unwrap();

        let mut paid = new_invoice("INV-001", client.id, vec![item("work", 1.0, 100.0)]);
        paid.status = InvoiceStatus::Paid;
        db.create_invoice(paid).await.unwrap();

        db.create_invoice(new_invoice(
            "INV-002",
            client.id,
            vec![item("work", 1.0, 50.0)],
        ))
        .await
        .unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.total_clients, 1);
        assert_eq!(stats.paid_invoices, 1);
        assert_eq!(stats.pending_invoices, 1);
        assert_eq!(stats.total_revenue, 100.0);
        assert_eq!(stats.pending_amount, 50.0);
    }

    #[tokio::test]
    async fn stats_on_empty_store_are_zero() {
        let db = test_db().await;

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total_invoices, 0);
        assert_eq!(stats.total_revenue, 0.0);
        assert_eq!(stats.pending_amount, 0.0);
    }
}

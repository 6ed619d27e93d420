use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a client. Name and email are required.
#[derive(Debug, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Partial update: only supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

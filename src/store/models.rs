//! Stored record types
//! Pure data structures mapped straight onto their tables

use serde::{Deserialize, Serialize};

/// One inventory line, keyed by `item_name`. Upserted in place on every
/// inventory ingestion; never duplicated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: i64,
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub price: f64,
}

/// Derived vendor view, fully owned by the most recent inventory ingestion.
/// Component scores are small integers in [1,5].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub delivery_score: i64,
    pub quality_score: i64,
    pub price_score: i64,
}

/// Derived product view, same full-replace lifecycle as `Vendor`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub available_quantity: i64,
    pub total_sold: i64,
}

/// Append-only expense line; accumulates across ingestions.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExpenseItem {
    pub id: i64,
    pub category: String,
    pub amount: f64,
    pub month: String,
}

/// Fraud signal, merged by `transaction_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FraudRecord {
    pub id: i64,
    pub transaction_id: String,
    pub amount: i64,
    pub is_fraud: bool,
}

/// Append-only hourly energy usage reading.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GreenGridRecord {
    pub id: i64,
    pub hour: String,
    pub usage_kwh: f64,
}

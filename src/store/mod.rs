//! Record store - SQLite persistence with typed read/write access
//!
//! All ingestion writes go through a caller-owned transaction so one upload
//! commits or rolls back as a unit. Analytics reads go straight through the
//! pool.

pub mod models;

pub use models::*;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

/// Open a connection pool and make sure the schema exists.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await?;
    init_schema(&pool).await?;
    info!("Record store ready at {}", database_url);
    Ok(pool)
}

/// Create all record tables if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS inventory_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_name TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            price REAL NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS vendors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            delivery_score INTEGER NOT NULL,
            quality_score INTEGER NOT NULL,
            price_score INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            available_quantity INTEGER NOT NULL,
            total_sold INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS expense_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            month TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS fraud_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT NOT NULL UNIQUE,
            amount INTEGER NOT NULL,
            is_fraud BOOLEAN NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS green_grid_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hour TEXT NOT NULL,
            usage_kwh REAL NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

// --- Reads (request-time analytics) ---------------------------------------

pub async fn list_inventory(pool: &SqlitePool) -> Result<Vec<InventoryItem>, sqlx::Error> {
    sqlx::query_as::<_, InventoryItem>(
        "SELECT id, item_name, category, quantity, price FROM inventory_items ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_vendors(pool: &SqlitePool) -> Result<Vec<Vendor>, sqlx::Error> {
    sqlx::query_as::<_, Vendor>(
        "SELECT id, name, delivery_score, quality_score, price_score FROM vendors ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_products(pool: &SqlitePool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, available_quantity, total_sold FROM products ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_expenses(pool: &SqlitePool) -> Result<Vec<ExpenseItem>, sqlx::Error> {
    sqlx::query_as::<_, ExpenseItem>(
        "SELECT id, category, amount, month FROM expense_items ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_fraud_records(pool: &SqlitePool) -> Result<Vec<FraudRecord>, sqlx::Error> {
    sqlx::query_as::<_, FraudRecord>(
        "SELECT id, transaction_id, amount, is_fraud FROM fraud_records ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_green_grid(pool: &SqlitePool) -> Result<Vec<GreenGridRecord>, sqlx::Error> {
    sqlx::query_as::<_, GreenGridRecord>(
        "SELECT id, hour, usage_kwh FROM green_grid_records ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn count_inventory(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory_items")
        .fetch_one(pool)
        .await
}

// --- Writes (ingestion-owned, always inside a transaction) ----------------

/// Insert or update one inventory line by its natural key.
pub async fn upsert_inventory_item(
    tx: &mut Transaction<'_, Sqlite>,
    item_name: &str,
    category: &str,
    quantity: i64,
    price: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO inventory_items (item_name, category, quantity, price)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (item_name) DO UPDATE SET
            category = excluded.category,
            quantity = excluded.quantity,
            price = excluded.price
        "#,
    )
    .bind(item_name)
    .bind(category)
    .bind(quantity)
    .bind(price)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Drop the derived vendor/product catalog ahead of regeneration.
pub async fn clear_derived_catalog(tx: &mut Transaction<'_, Sqlite>) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM vendors").execute(&mut **tx).await?;
    sqlx::query("DELETE FROM products").execute(&mut **tx).await?;
    Ok(())
}

pub async fn insert_vendor(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    delivery_score: i64,
    quality_score: i64,
    price_score: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO vendors (name, delivery_score, quality_score, price_score) VALUES ($1, $2, $3, $4)",
    )
    .bind(name)
    .bind(delivery_score)
    .bind(quality_score)
    .bind(price_score)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_product(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    available_quantity: i64,
    total_sold: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO products (name, available_quantity, total_sold) VALUES ($1, $2, $3)")
        .bind(name)
        .bind(available_quantity)
        .bind(total_sold)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_expense(
    tx: &mut Transaction<'_, Sqlite>,
    category: &str,
    amount: f64,
    month: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO expense_items (category, amount, month) VALUES ($1, $2, $3)")
        .bind(category)
        .bind(amount)
        .bind(month)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Insert or merge one fraud signal by transaction id.
pub async fn upsert_fraud_record(
    tx: &mut Transaction<'_, Sqlite>,
    transaction_id: &str,
    amount: i64,
    is_fraud: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO fraud_records (transaction_id, amount, is_fraud)
        VALUES ($1, $2, $3)
        ON CONFLICT (transaction_id) DO UPDATE SET
            amount = excluded.amount,
            is_fraud = excluded.is_fraud
        "#,
    )
    .bind(transaction_id)
    .bind(amount)
    .bind(is_fraud)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_green_grid(
    tx: &mut Transaction<'_, Sqlite>,
    hour: &str,
    usage_kwh: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO green_grid_records (hour, usage_kwh) VALUES ($1, $2)")
        .bind(hour)
        .bind(usage_kwh)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

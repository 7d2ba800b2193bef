//! Ingestion orchestrator - validate, normalize, score, persist
//!
//! One uploaded file per call. All writes happen inside a single
//! transaction: either the whole batch commits or none of it does.

use crate::analytics::catalog::{derive_products, score_vendors_from_batch};
use crate::ingestion::normalize::{normalize, resolve_inventory_aliases};
use crate::ingestion::parse::parse_upload;
use crate::ingestion::quality::score_batch;
use crate::ingestion::schema::SchemaRegistry;
use crate::ingestion::types::{Batch, DatasetType, IngestError, IngestOutcome, Value};
use crate::ingestion::validate::validate_schema;
use crate::store;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

/// Run the full ingestion pipeline for one uploaded file.
///
/// Steps, strictly in order: extension check, parse, schema validation,
/// normalization, quality scoring (always on the normalized batch), then
/// persistence inside one transaction. Any error before the commit leaves
/// the store untouched.
pub async fn ingest_file(
    pool: &SqlitePool,
    registry: &SchemaRegistry,
    dataset_type: DatasetType,
    filename: &str,
    content: &[u8],
) -> Result<IngestOutcome, IngestError> {
    info!("Ingesting {} as {} data", filename, dataset_type);

    let batch = parse_upload(filename, content)?;
    if batch.is_empty() {
        return Err(IngestError::InputFormat(
            "the uploaded CSV file is empty".to_string(),
        ));
    }

    let batch = if dataset_type == DatasetType::Inventory {
        resolve_inventory_aliases(&batch, registry)
    } else {
        batch
    };

    let validation = validate_schema(&batch, registry.schema(dataset_type));
    if !validation.ok {
        warn!(
            "Schema validation failed for {}: missing {:?}",
            filename, validation.missing
        );
        return Err(IngestError::Schema {
            missing: validation.missing,
        });
    }
    info!("Schema variant: {}", validation.variant.as_str());

    let cleaned = normalize(&batch, dataset_type, validation.variant, registry);
    if cleaned.is_empty() {
        return Err(IngestError::EmptyAfterCleaning);
    }

    // Quality is always measured post-cleaning, on what actually gets stored.
    let quality = score_batch(&cleaned, dataset_type, validation.variant, registry);
    info!(
        "Quality score {} ({:?})",
        quality.data_quality_score, quality.reliability_label
    );

    let mut tx = pool.begin().await?;
    let stored = match store_batch(&mut tx, dataset_type, &cleaned).await {
        Ok(counts) => counts,
        Err(e) => {
            warn!("Storage failed, rolling back batch: {}", e);
            tx.rollback().await.ok();
            return Err(IngestError::Storage(e));
        }
    };
    tx.commit().await?;

    info!(
        "✓ Stored {} records ({} failed) for {}",
        stored.0, stored.1, dataset_type
    );

    Ok(IngestOutcome {
        success: true,
        records_processed: stored.0,
        records_failed: stored.1,
        dataset_type,
        quality,
        ingested_at: Utc::now(),
    })
}

/// Dispatch to the dataset-type-specific store routine.
/// Returns (processed, failed) row counts.
async fn store_batch(
    tx: &mut Transaction<'_, Sqlite>,
    dataset_type: DatasetType,
    batch: &Batch,
) -> Result<(u64, u64), sqlx::Error> {
    match dataset_type {
        DatasetType::Inventory => store_inventory(tx, batch).await,
        DatasetType::Expense => store_expense(tx, batch).await,
        DatasetType::Fraud => store_fraud(tx, batch).await,
        DatasetType::Energy => store_energy(tx, batch).await,
    }
}

async fn store_expense(
    tx: &mut Transaction<'_, Sqlite>,
    batch: &Batch,
) -> Result<(u64, u64), sqlx::Error> {
    let mut processed = 0;
    let mut failed = 0;
    for row in &batch.rows {
        let category = batch.cell(row, "category").to_text_lossy();
        if category.is_empty() {
            failed += 1;
            continue;
        }
        let amount = batch.cell(row, "amount").as_number().unwrap_or(0.0);
        let month = batch.cell(row, "month").to_text_lossy();
        store::insert_expense(tx, &category, amount, &month).await?;
        processed += 1;
    }
    Ok((processed, failed))
}

async fn store_fraud(
    tx: &mut Transaction<'_, Sqlite>,
    batch: &Batch,
) -> Result<(u64, u64), sqlx::Error> {
    let mut processed = 0;
    let mut failed = 0;
    for row in &batch.rows {
        let transaction_id = batch.cell(row, "transaction_id").to_text_lossy();
        if transaction_id.is_empty() {
            failed += 1;
            continue;
        }
        let amount = batch.cell(row, "amount").as_number().unwrap_or(0.0).trunc() as i64;
        let is_fraud = matches!(batch.cell(row, "is_fraud"), Value::Bool(true));
        store::upsert_fraud_record(tx, &transaction_id, amount, is_fraud).await?;
        processed += 1;
    }
    Ok((processed, failed))
}

async fn store_energy(
    tx: &mut Transaction<'_, Sqlite>,
    batch: &Batch,
) -> Result<(u64, u64), sqlx::Error> {
    let mut processed = 0;
    let mut failed = 0;
    for row in &batch.rows {
        let hour = batch.cell(row, "hour").to_text_lossy();
        if hour.is_empty() {
            failed += 1;
            continue;
        }
        let usage_kwh = batch.cell(row, "usage_kwh").as_number().unwrap_or(0.0);
        store::insert_green_grid(tx, &hour, usage_kwh).await?;
        processed += 1;
    }
    Ok((processed, failed))
}

/// One inventory record after collapsing duplicate item_names in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedItem {
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub price: f64,
    pub vendor: String,
}

/// Collapse duplicate item_names within one batch so each key is upserted
/// exactly once. Later rows win on category/quantity/price; the vendor keeps
/// the last non-empty value so a blank cell never wipes a valid mapping.
pub fn consolidate_inventory(batch: &Batch) -> (Vec<ConsolidatedItem>, u64) {
    let mut order: Vec<String> = Vec::new();
    let mut items: Vec<ConsolidatedItem> = Vec::new();
    let mut skipped = 0;

    for row in &batch.rows {
        let item_name = batch.cell(row, "item_name").to_text_lossy();
        let item_name = item_name.trim();
        if item_name.is_empty() {
            skipped += 1;
            continue;
        }

        let vendor = match batch.cell(row, "vendor") {
            Value::Text(s) => s.trim().to_string(),
            _ => String::new(),
        };

        let record = ConsolidatedItem {
            item_name: item_name.to_string(),
            category: batch.cell(row, "category").to_text_lossy().trim().to_string(),
            quantity: batch.cell(row, "quantity").as_number().unwrap_or(0.0).trunc() as i64,
            price: batch.cell(row, "price").as_number().unwrap_or(0.0),
            vendor: vendor.clone(),
        };

        match order.iter().position(|n| n == item_name) {
            Some(idx) => {
                let previous_vendor = items[idx].vendor.clone();
                items[idx] = ConsolidatedItem {
                    vendor: if vendor.is_empty() { previous_vendor } else { vendor },
                    ..record
                };
            }
            None => {
                order.push(item_name.to_string());
                items.push(record);
            }
        }
    }

    (items, skipped)
}

/// Inventory ingestion: upsert items by item_name, then regenerate the
/// derived Vendor/Product catalog from the same batch. All three effects
/// share the caller's transaction and commit or roll back together.
async fn store_inventory(
    tx: &mut Transaction<'_, Sqlite>,
    batch: &Batch,
) -> Result<(u64, u64), sqlx::Error> {
    let (consolidated, failed) = consolidate_inventory(batch);

    let mut processed = 0;
    for item in &consolidated {
        store::upsert_inventory_item(tx, &item.item_name, &item.category, item.quantity, item.price)
            .await?;
        processed += 1;
    }

    regenerate_derived_catalog(tx, batch, &consolidated).await?;

    Ok((processed, failed))
}

/// Replace the derived catalog: delete all Vendor and Product rows, then
/// rebuild both purely from the current batch. Runs inside the ingestion
/// transaction, so a failure here rolls the whole upload back.
pub async fn regenerate_derived_catalog(
    tx: &mut Transaction<'_, Sqlite>,
    batch: &Batch,
    consolidated: &[ConsolidatedItem],
) -> Result<(), sqlx::Error> {
    store::clear_derived_catalog(tx).await?;

    for vendor in score_vendors_from_batch(batch) {
        store::insert_vendor(
            tx,
            &vendor.name,
            vendor.delivery_score,
            vendor.quality_score,
            vendor.price_score,
        )
        .await?;
    }

    let pairs: Vec<(String, i64)> = consolidated
        .iter()
        .map(|item| (item.item_name.clone(), item.quantity))
        .collect();
    for product in derive_products(&pairs) {
        store::insert_product(tx, &product.name, product.available_quantity, product.total_sold)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::ReliabilityLabel;

    async fn test_pool() -> SqlitePool {
        store::connect("sqlite::memory:").await.unwrap()
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    #[tokio::test]
    async fn test_expense_ingestion_end_to_end() {
        let pool = test_pool().await;
        let csv = b"category,amount,month\nrent,1200,2024-01\npower,300,2024-02\n";

        let outcome = ingest_file(&pool, &registry(), DatasetType::Expense, "expenses.csv", csv)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.records_processed, 2);
        assert_eq!(outcome.records_failed, 0);
        assert_eq!(outcome.quality.data_quality_score, 100.0);
        assert_eq!(outcome.quality.reliability_label, ReliabilityLabel::High);

        let stored = store::list_expenses(&pool).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].category, "rent");
        assert_eq!(stored[0].amount, 1200.0);
    }

    #[tokio::test]
    async fn test_rejects_wrong_extension() {
        let pool = test_pool().await;
        let err = ingest_file(&pool, &registry(), DatasetType::Expense, "data.txt", b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::InputFormat(_)));
    }

    #[tokio::test]
    async fn test_rejects_missing_columns_with_names() {
        let pool = test_pool().await;
        let csv = b"amount\n10\n";

        let err = ingest_file(&pool, &registry(), DatasetType::Fraud, "f.csv", csv)
            .await
            .unwrap_err();
        match err {
            IngestError::Schema { missing } => {
                assert_eq!(missing, vec!["is_fraud".to_string(), "transaction_id".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
        assert!(store::list_fraud_records(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_batch_empty_after_cleaning() {
        let pool = test_pool().await;
        // every row is missing its item_name
        let csv = b"item_name,category,quantity,price\n,tools,4,1\n,tools,5,2\n";

        let err = ingest_file(&pool, &registry(), DatasetType::Inventory, "inv.csv", csv)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptyAfterCleaning));
    }

    #[tokio::test]
    async fn test_duplicate_item_names_collapse_to_one() {
        let pool = test_pool().await;
        let csv = b"item_name,category,quantity,price,vendor\n\
                    A,tools,10,2.5,Acme\n\
                    A,tools,20,2.5,\n";

        let outcome = ingest_file(&pool, &registry(), DatasetType::Inventory, "inv.csv", csv)
            .await
            .unwrap();
        assert_eq!(outcome.records_processed, 1);

        let items = store::list_inventory(&pool).await.unwrap();
        assert_eq!(items.len(), 1);
        // last write wins on quantity
        assert_eq!(items[0].quantity, 20);

        // the blank second vendor cell must not wipe the earlier mapping
        let vendors = store::list_vendors(&pool).await.unwrap();
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0].name, "Acme");
    }

    #[tokio::test]
    async fn test_inventory_reingest_is_idempotent() {
        let pool = test_pool().await;
        let csv = b"item_name,category,quantity,price,vendor\n\
                    A,tools,10,2.5,Acme\n\
                    B,tools,30,4.0,Zenith\n";

        for _ in 0..2 {
            ingest_file(&pool, &registry(), DatasetType::Inventory, "inv.csv", csv)
                .await
                .unwrap();
        }

        assert_eq!(store::list_inventory(&pool).await.unwrap().len(), 2);
        assert_eq!(store::list_vendors(&pool).await.unwrap().len(), 2);
        assert_eq!(store::list_products(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_catalog_replaced_not_accumulated() {
        let pool = test_pool().await;
        let first = b"item_name,category,quantity,price,vendor\nA,tools,10,2.5,Acme\n";
        let second = b"item_name,category,quantity,price,vendor\nB,tools,5,1.0,Zenith\n";

        ingest_file(&pool, &registry(), DatasetType::Inventory, "a.csv", first)
            .await
            .unwrap();
        ingest_file(&pool, &registry(), DatasetType::Inventory, "b.csv", second)
            .await
            .unwrap();

        let vendors = store::list_vendors(&pool).await.unwrap();
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0].name, "Zenith");

        let products = store::list_products(&pool).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "B");

        // inventory items accumulate across uploads, unlike the catalog
        assert_eq!(store::list_inventory(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back_whole_batch() {
        let pool = test_pool().await;
        let first = b"item_name,category,quantity,price,vendor\nA,tools,10,2.5,Acme\n";
        ingest_file(&pool, &registry(), DatasetType::Inventory, "a.csv", first)
            .await
            .unwrap();

        // sabotage the catalog so regeneration fails mid-transaction
        sqlx::query("DROP TABLE products").execute(&pool).await.unwrap();

        let second = b"item_name,category,quantity,price,vendor\nA,tools,99,9.9,Other\n";
        let err = ingest_file(&pool, &registry(), DatasetType::Inventory, "b.csv", second)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Storage(_)));

        // the failed batch must not have touched the item or vendor rows
        let items = store::list_inventory(&pool).await.unwrap();
        assert_eq!(items[0].quantity, 10);
        let vendors = store::list_vendors(&pool).await.unwrap();
        assert_eq!(vendors[0].name, "Acme");
    }

    #[tokio::test]
    async fn test_fraud_records_merge_across_uploads() {
        let pool = test_pool().await;
        let first = b"transaction_id,amount,is_fraud\nt1,100,false\nt2,50,true\n";
        let second = b"transaction_id,amount,is_fraud\nt1,175,true\n";

        ingest_file(&pool, &registry(), DatasetType::Fraud, "f1.csv", first)
            .await
            .unwrap();
        ingest_file(&pool, &registry(), DatasetType::Fraud, "f2.csv", second)
            .await
            .unwrap();

        let records = store::list_fraud_records(&pool).await.unwrap();
        assert_eq!(records.len(), 2);
        let t1 = records.iter().find(|r| r.transaction_id == "t1").unwrap();
        assert_eq!(t1.amount, 175);
        assert!(t1.is_fraud);
    }

    #[tokio::test]
    async fn test_legacy_energy_upload_accepted_with_penalty() {
        let pool = test_pool().await;
        let csv = b"time,kwh\n00:00,12.5\n01:00,10.0\n";

        let outcome = ingest_file(&pool, &registry(), DatasetType::Energy, "grid.csv", csv)
            .await
            .unwrap();

        assert_eq!(outcome.quality.issue_breakdown.schema_mismatch_percent, 20.0);
        let records = store::list_green_grid(&pool).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hour, "00:00");
    }

    #[tokio::test]
    async fn test_aliased_inventory_headers_accepted() {
        let pool = test_pool().await;
        let csv = b"sku,cat,qty,cost\nWidget,tools,7,3.5\n";

        let outcome = ingest_file(&pool, &registry(), DatasetType::Inventory, "inv.csv", csv)
            .await
            .unwrap();
        assert_eq!(outcome.quality.issue_breakdown.schema_mismatch_percent, 0.0);

        let items = store::list_inventory(&pool).await.unwrap();
        assert_eq!(items[0].item_name, "Widget");
        assert_eq!(items[0].quantity, 7);
    }

    #[test]
    fn test_consolidation_last_nonempty_vendor_wins() {
        let batch = Batch {
            columns: vec![
                "item_name".into(),
                "category".into(),
                "quantity".into(),
                "price".into(),
                "vendor".into(),
            ],
            rows: vec![
                vec![
                    Value::Text("A".into()),
                    Value::Text("x".into()),
                    Value::Number(10.0),
                    Value::Number(1.0),
                    Value::Text("Acme".into()),
                ],
                vec![
                    Value::Text("A".into()),
                    Value::Text("x".into()),
                    Value::Number(20.0),
                    Value::Number(2.0),
                    Value::Null,
                ],
                vec![
                    Value::Text("A".into()),
                    Value::Text("x".into()),
                    Value::Number(30.0),
                    Value::Number(3.0),
                    Value::Text("Zenith".into()),
                ],
            ],
        };

        let (items, skipped) = consolidate_inventory(&batch);
        assert_eq!(skipped, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 30);
        assert_eq!(items[0].vendor, "Zenith");
    }
}

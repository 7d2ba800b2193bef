//! Inventory analytics - reorder suggestions and a short depletion forecast

use crate::analytics::trend::TrendEstimator;
use crate::store;
use serde::Serialize;
use sqlx::SqlitePool;

/// Cheap existence probe for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryStatus {
    pub has_data: bool,
    pub row_count: i64,
}

pub async fn inventory_status(pool: &SqlitePool) -> Result<InventoryStatus, sqlx::Error> {
    let count = store::count_inventory(pool).await?;
    Ok(InventoryStatus {
        has_data: count > 0,
        row_count: count,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryItem {
    pub name: String,
    pub stock: i64,
    pub reorder_at: i64,
    pub category: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventorySummary {
    pub items: Vec<SummaryItem>,
    pub low_stock_count: u64,
    pub suggestions: Vec<String>,
}

/// Reorder threshold: 20% of the largest stocked quantity, never below 5.
fn reorder_threshold(quantities: &[i64]) -> i64 {
    let max_qty = quantities.iter().copied().max().unwrap_or(0);
    (5i64).max((max_qty as f64 * 0.2).round() as i64)
}

/// Stock summary with low-stock detection and up to 5 reorder suggestions.
pub async fn inventory_summary(pool: &SqlitePool) -> Result<InventorySummary, sqlx::Error> {
    let db_items = store::list_inventory(pool).await?;
    if db_items.is_empty() {
        return Ok(InventorySummary {
            items: Vec::new(),
            low_stock_count: 0,
            suggestions: Vec::new(),
        });
    }

    let quantities: Vec<i64> = db_items.iter().map(|i| i.quantity).collect();
    let threshold = reorder_threshold(&quantities);

    let items: Vec<SummaryItem> = db_items
        .into_iter()
        .map(|i| SummaryItem {
            name: i.item_name,
            stock: i.quantity,
            reorder_at: threshold,
            category: i.category,
            price: i.price,
        })
        .collect();

    let low_stock: Vec<&SummaryItem> = items.iter().filter(|i| i.stock < i.reorder_at).collect();
    let suggestions = low_stock
        .iter()
        .take(5)
        .map(|i| {
            format!(
                "Reorder {} soon (current stock: {}, threshold: {})",
                i.name, i.stock, i.reorder_at
            )
        })
        .collect();

    Ok(InventorySummary {
        low_stock_count: low_stock.len() as u64,
        items,
        suggestions,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub week: String,
    pub predicted_stock: f64,
}

/// Four-week depletion projection assuming an 8% weekly consumption rate of
/// total current stock. The line is fit on a 5-point proxy series so the
/// estimator strategy stays on the same path as every other trend consumer;
/// the proxy is exactly linear, so the fit reproduces the direct rule.
pub fn forecast_from_total(total_qty: i64, estimator: &dyn TrendEstimator) -> Vec<ForecastPoint> {
    let total = total_qty as f64;
    let weekly_rate = total * 0.08;

    let xs: Vec<f64> = (1..=5).map(|i| i as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|x| total - weekly_rate * x).collect();
    let fit = estimator.fit(&xs, &ys);

    (1..=4)
        .map(|i| ForecastPoint {
            week: format!("W{i}"),
            predicted_stock: fit.predict(i as f64).round().max(0.0),
        })
        .collect()
}

pub async fn inventory_forecast(
    pool: &SqlitePool,
    estimator: &dyn TrendEstimator,
) -> Result<Vec<ForecastPoint>, sqlx::Error> {
    let items = store::list_inventory(pool).await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let total: i64 = items.iter().map(|i| i.quantity).sum();
    Ok(forecast_from_total(total, estimator))
}

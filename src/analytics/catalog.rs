//! Derived catalog - vendor and product views regenerated from inventory
//!
//! The Vendor and Product tables are fully owned by the most recent
//! inventory ingestion; everything here either computes their replacement
//! rows from an uploaded batch or reads them back with their public scores.

use crate::ingestion::quality::percentile;
use crate::ingestion::types::{Batch, Value};
use crate::store;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Replacement row for the vendors table; all scores in [1,5].
#[derive(Debug, Clone, PartialEq)]
pub struct VendorScore {
    pub name: String,
    pub delivery_score: i64,
    pub quality_score: i64,
    pub price_score: i64,
}

/// Replacement row for the products table.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedProduct {
    pub name: String,
    pub available_quantity: i64,
    pub total_sold: i64,
}

struct VendorMetrics {
    name: String,
    items: HashSet<String>,
    qty_sum: i64,
    qty_count: u64,
    price_sum: f64,
    price_count: u64,
    low_stock_count: u64,
}

/// Score every distinct vendor in an inventory batch.
///
/// Vendors group case-insensitively by trimmed name (first spelling wins for
/// display). Raw metrics - distinct product count, mean quantity, mean
/// price, low-stock ratio against the batch's 20th quantity percentile -
/// scale linearly into [1,5] against the best vendor on each metric; the
/// price score inverts so cheaper vendors score higher.
pub fn score_vendors_from_batch(batch: &Batch) -> Vec<VendorScore> {
    if !batch.has_column("vendor") {
        return Vec::new();
    }

    let mut quantities: Vec<f64> = batch
        .rows
        .iter()
        .map(|row| batch.cell(row, "quantity").as_number().unwrap_or(0.0))
        .collect();
    quantities.sort_by(|a, b| a.total_cmp(b));
    let low_stock_threshold = percentile(&quantities, 0.2).trunc() as i64;

    // first-seen order keeps regeneration deterministic
    let mut order: Vec<String> = Vec::new();
    let mut metrics: Vec<VendorMetrics> = Vec::new();

    for row in &batch.rows {
        let vendor_name = match batch.cell(row, "vendor") {
            Value::Text(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => continue,
        };
        let key = vendor_name.to_lowercase();

        let idx = match order.iter().position(|k| *k == key) {
            Some(idx) => idx,
            None => {
                order.push(key);
                metrics.push(VendorMetrics {
                    name: vendor_name,
                    items: HashSet::new(),
                    qty_sum: 0,
                    qty_count: 0,
                    price_sum: 0.0,
                    price_count: 0,
                    low_stock_count: 0,
                });
                metrics.len() - 1
            }
        };
        let m = &mut metrics[idx];

        let item_name = batch.cell(row, "item_name").to_text_lossy();
        if !item_name.trim().is_empty() {
            m.items.insert(item_name.trim().to_string());
        }

        let qty = batch.cell(row, "quantity").as_number().unwrap_or(0.0).trunc() as i64;
        m.qty_sum += qty;
        m.qty_count += 1;

        m.price_sum += batch.cell(row, "price").as_number().unwrap_or(0.0);
        m.price_count += 1;

        if low_stock_threshold > 0 && qty <= low_stock_threshold {
            m.low_stock_count += 1;
        }
    }

    let max_product_count = metrics.iter().map(|m| m.items.len()).max().unwrap_or(0);
    let max_avg_qty = metrics
        .iter()
        .map(|m| m.avg_qty())
        .fold(0.0f64, f64::max);
    let max_avg_price = metrics
        .iter()
        .map(|m| m.avg_price())
        .fold(0.0f64, f64::max);

    metrics
        .iter()
        .map(|m| {
            let delivery_score = if max_product_count > 0 {
                scale_1_to_5(m.items.len() as f64 / max_product_count as f64)
            } else {
                3
            };

            let mut quality_score = if max_avg_qty > 0.0 {
                scale_1_to_5(m.avg_qty() / max_avg_qty)
            } else {
                3
            };
            if m.low_stock_ratio() > 0.5 {
                quality_score = (quality_score - 1).max(1);
            }

            let price_score = if max_avg_price > 0.0 {
                scale_1_to_5(1.0 - m.avg_price() / max_avg_price)
            } else {
                3
            };

            VendorScore {
                name: m.name.clone(),
                delivery_score: delivery_score.clamp(1, 5),
                quality_score: quality_score.clamp(1, 5),
                price_score: price_score.clamp(1, 5),
            }
        })
        .collect()
}

impl VendorMetrics {
    fn avg_qty(&self) -> f64 {
        if self.qty_count == 0 {
            0.0
        } else {
            self.qty_sum as f64 / self.qty_count as f64
        }
    }

    fn avg_price(&self) -> f64 {
        if self.price_count == 0 {
            0.0
        } else {
            self.price_sum / self.price_count as f64
        }
    }

    fn low_stock_ratio(&self) -> f64 {
        if self.qty_count == 0 {
            0.0
        } else {
            self.low_stock_count as f64 / self.qty_count as f64
        }
    }
}

fn scale_1_to_5(ratio: f64) -> i64 {
    (1.0 + 4.0 * ratio).round() as i64
}

/// Derive product rows from consolidated (item_name, quantity) pairs.
///
/// There is no sales history in an inventory upload, so `total_sold` uses
/// the canonical rule: the gap to the best-stocked item,
/// `max(0, max_quantity - quantity)`.
pub fn derive_products(items: &[(String, i64)]) -> Vec<DerivedProduct> {
    let max_qty = items.iter().map(|(_, q)| *q).max().unwrap_or(0);

    items
        .iter()
        .map(|(name, qty)| DerivedProduct {
            name: name.clone(),
            available_quantity: *qty,
            total_sold: if max_qty > 0 { (max_qty - qty).max(0) } else { 0 },
        })
        .collect()
}

/// Public 0-100 vendor rating from the three component scores.
pub fn vendor_rating(delivery_score: i64, quality_score: i64, price_score: i64) -> i64 {
    let raw =
        (delivery_score as f64 * 0.4 + quality_score as f64 * 0.4 + price_score as f64 * 0.2) * 20.0;
    raw.clamp(0.0, 100.0).round() as i64
}

/// Demand score for one product: share of total units already sold, 0-100.
pub fn product_demand(available_quantity: i64, total_sold: i64) -> i64 {
    let total = available_quantity + total_sold;
    if total <= 0 {
        return 0;
    }
    (total_sold as f64 / total as f64 * 100.0).clamp(0.0, 100.0).round() as i64
}

/// Vendor list payload for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct VendorReport {
    pub id: i64,
    pub name: String,
    pub rating: i64,
}

/// Product list payload for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ProductReport {
    pub id: i64,
    pub name: String,
    pub demand: i64,
    pub available_quantity: i64,
    pub total_sold: i64,
}

pub async fn list_vendors_with_rating(pool: &SqlitePool) -> Result<Vec<VendorReport>, sqlx::Error> {
    let vendors = store::list_vendors(pool).await?;
    Ok(vendors
        .into_iter()
        .map(|v| VendorReport {
            rating: vendor_rating(v.delivery_score, v.quality_score, v.price_score),
            id: v.id,
            name: v.name,
        })
        .collect())
}

pub async fn list_products_with_demand(
    pool: &SqlitePool,
) -> Result<Vec<ProductReport>, sqlx::Error> {
    let products = store::list_products(pool).await?;
    Ok(products
        .into_iter()
        .map(|p| ProductReport {
            demand: product_demand(p.available_quantity, p.total_sold),
            id: p.id,
            name: p.name,
            available_quantity: p.available_quantity,
            total_sold: p.total_sold,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn inventory_batch(rows: Vec<Vec<Value>>) -> Batch {
        Batch {
            columns: vec![
                "item_name".into(),
                "category".into(),
                "quantity".into(),
                "price".into(),
                "vendor".into(),
            ],
            rows,
        }
    }

    #[test]
    fn test_no_vendor_column_yields_no_vendors() {
        let batch = Batch::new(vec!["item_name".into(), "quantity".into()]);
        assert!(score_vendors_from_batch(&batch).is_empty());
    }

    #[test]
    fn test_vendor_grouping_is_case_insensitive() {
        let batch = inventory_batch(vec![
            vec![text("A"), text("x"), num(10.0), num(2.0), text("Acme")],
            vec![text("B"), text("x"), num(20.0), num(3.0), text("ACME")],
            vec![text("C"), text("x"), num(30.0), num(4.0), text("Zenith")],
        ]);

        let scores = score_vendors_from_batch(&batch);
        assert_eq!(scores.len(), 2);
        // first spelling wins for display
        assert_eq!(scores[0].name, "Acme");
        assert_eq!(scores[1].name, "Zenith");
    }

    #[test]
    fn test_scores_stay_in_1_to_5() {
        let batch = inventory_batch(vec![
            vec![text("A"), text("x"), num(100.0), num(1.0), text("Best")],
            vec![text("B"), text("x"), num(100.0), num(1.0), text("Best")],
            vec![text("C"), text("x"), num(1.0), num(500.0), text("Worst")],
        ]);

        for s in score_vendors_from_batch(&batch) {
            assert!((1..=5).contains(&s.delivery_score));
            assert!((1..=5).contains(&s.quality_score));
            assert!((1..=5).contains(&s.price_score));
        }
    }

    #[test]
    fn test_top_vendor_scores_five_cheapest_wins_price() {
        let batch = inventory_batch(vec![
            vec![text("A"), text("x"), num(50.0), num(1.0), text("Cheap")],
            vec![text("B"), text("x"), num(50.0), num(100.0), text("Dear")],
        ]);

        let scores = score_vendors_from_batch(&batch);
        let cheap = scores.iter().find(|s| s.name == "Cheap").unwrap();
        let dear = scores.iter().find(|s| s.name == "Dear").unwrap();

        assert_eq!(cheap.price_score, 5);
        assert_eq!(dear.price_score, 1);
        // both carry one product and equal quantity, so the other metrics tie
        assert_eq!(cheap.delivery_score, dear.delivery_score);
    }

    #[test]
    fn test_low_stock_penalty_applies() {
        // quantities [1,1,88,100,100] -> p20 threshold 1; two of Acme's three
        // rows sit at the threshold, so its low-stock ratio is 2/3
        let batch = inventory_batch(vec![
            vec![text("A"), text("x"), num(1.0), num(2.0), text("Acme")],
            vec![text("B"), text("x"), num(1.0), num(2.0), text("Acme")],
            vec![text("C"), text("x"), num(88.0), num(2.0), text("Acme")],
            vec![text("D"), text("x"), num(100.0), num(2.0), text("Zenith")],
            vec![text("E"), text("x"), num(100.0), num(2.0), text("Zenith")],
        ]);

        let scores = score_vendors_from_batch(&batch);
        let acme = scores.iter().find(|s| s.name == "Acme").unwrap();
        // avg qty 30 vs max 100 scales to 2, then the low-stock penalty drops it to 1
        assert_eq!(acme.quality_score, 1);
    }

    #[test]
    fn test_derive_products_total_sold_rule() {
        let items = vec![
            ("A".to_string(), 10i64),
            ("B".to_string(), 20i64),
            ("C".to_string(), 5i64),
        ];

        let products = derive_products(&items);
        assert_eq!(products[0].total_sold, 10); // 20 - 10
        assert_eq!(products[1].total_sold, 0); // best stocked
        assert_eq!(products[2].total_sold, 15);
    }

    #[test]
    fn test_derive_products_all_zero_quantities() {
        let items = vec![("A".to_string(), 0i64), ("B".to_string(), 0i64)];
        for p in derive_products(&items) {
            assert_eq!(p.total_sold, 0);
        }
    }

    #[test]
    fn test_vendor_rating_bounds() {
        assert_eq!(vendor_rating(5, 5, 5), 100);
        assert_eq!(vendor_rating(1, 1, 1), 20);
        // weighted: (4*0.4 + 3*0.4 + 2*0.2) * 20 = 64
        assert_eq!(vendor_rating(4, 3, 2), 64);
    }

    #[test]
    fn test_product_demand_formula() {
        assert_eq!(product_demand(0, 0), 0);
        assert_eq!(product_demand(10, 0), 0);
        assert_eq!(product_demand(0, 10), 100);
        // 15 sold of 60 total -> 25
        assert_eq!(product_demand(45, 15), 25);
    }
}

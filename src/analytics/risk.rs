//! Unified risk index - weighted blend of fraud, cash, inventory and
//! supplier/energy risk signals

use crate::analytics::energy::green_grid_overview;
use crate::analytics::expense::expense_summary;
use crate::analytics::fraud::fraud_insights;
use crate::analytics::inventory::inventory_summary;
use crate::analytics::trend::{sample_std, trend_metrics, TrendDirection, TrendEstimator};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
pub struct UnifiedRiskReport {
    pub unified_risk_index: f64,
    pub trend_direction: TrendDirection,
    pub volatility_score: f64,
    pub confidence_percentage: f64,
}

/// Linear rescale of `value` into [0,1] over the window; degenerate windows
/// read as 0.
fn normalize(value: f64, min_v: f64, max_v: f64) -> f64 {
    if max_v == min_v {
        return 0.0;
    }
    ((value - min_v) / (max_v - min_v)).clamp(0.0, 1.0)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Compute the unified risk index over the current store.
///
/// Component weights: fraud 0.35, cash 0.25, inventory 0.20, supplier 0.20.
/// Each component normalizes its raw percentage over a fixed window before
/// scaling to 0-100, so a single hot signal cannot saturate the index.
/// A synthetic 3-point series over the components feeds the shared trend
/// routine for direction and volatility; confidence falls with volatility.
pub async fn unified_risk(
    pool: &SqlitePool,
    estimator: &dyn TrendEstimator,
) -> Result<UnifiedRiskReport, sqlx::Error> {
    let fraud = fraud_insights(pool).await?;
    let expense = expense_summary(pool).await?;
    let inventory = inventory_summary(pool).await?;
    let green = green_grid_overview(pool).await?;

    let fraud_risk = normalize(fraud.fraud_rate_pct, 0.0, 60.0) * 100.0;

    let cat_values: Vec<f64> = expense.by_category.iter().map(|c| c.value).collect();
    let cash_instability_pct = if cat_values.len() > 1 {
        let mean_v = cat_values.iter().sum::<f64>() / cat_values.len() as f64;
        let denom = if mean_v == 0.0 { 1.0 } else { mean_v.abs() };
        sample_std(&cat_values) / denom * 100.0
    } else {
        0.0
    };
    let cash_risk = normalize(cash_instability_pct, 0.0, 80.0) * 100.0;

    let depletion_pct = if inventory.items.is_empty() {
        0.0
    } else {
        inventory.low_stock_count as f64 / inventory.items.len() as f64 * 100.0
    };
    let inventory_risk = normalize(depletion_pct, 0.0, 70.0) * 100.0;

    // higher usage and more savings headroom both read as supplier fragility
    let supplier_risk = (normalize(green.current_usage_kwh, 0.0, 100.0) * 0.6
        + normalize(green.potential_savings_percent, 0.0, 40.0) * 0.4)
        * 100.0;

    let unified_risk_index = (fraud_risk * 0.35
        + cash_risk * 0.25
        + inventory_risk * 0.20
        + supplier_risk * 0.20)
        .clamp(0.0, 100.0);

    let history = [fraud_risk, (fraud_risk + cash_risk) / 2.0, unified_risk_index];
    let trend = trend_metrics(&history, estimator);

    let confidence =
        (90.0 - normalize(trend.volatility_score, 0.0, 80.0) * 40.0).clamp(0.0, 100.0);

    Ok(UnifiedRiskReport {
        unified_risk_index: round1(unified_risk_index),
        trend_direction: trend.direction,
        volatility_score: round1(trend.volatility_score),
        confidence_percentage: round1(confidence),
    })
}

//! Revenue intelligence - momentum, sustainability and a banded forecast
//!
//! There is no revenue table; expense amounts grouped by month act as a
//! proxy for revenue movement over time, which is enough for trend and
//! stability signals.

use crate::analytics::fraud::fraud_insights;
use crate::analytics::inventory::inventory_summary;
use crate::analytics::trend::{mean, moving_average, residual_sigma, sample_std, TrendEstimator};
use crate::store;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBandPoint {
    pub step: u32,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAveragePoint {
    pub index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastData {
    pub horizon_days: Vec<u32>,
    pub points: Vec<ForecastBandPoint>,
    pub moving_average: Vec<MovingAveragePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueIntelligence {
    pub revenue_momentum_index: f64,
    pub sustainability_score: f64,
    pub growth_risk_flag: bool,
    pub forecast_data: ForecastData,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn empty_report() -> RevenueIntelligence {
    RevenueIntelligence {
        revenue_momentum_index: 0.0,
        sustainability_score: 0.0,
        growth_risk_flag: true,
        forecast_data: ForecastData {
            horizon_days: vec![30, 60, 90],
            points: Vec::new(),
            moving_average: Vec::new(),
        },
    }
}

/// Monthly revenue-proxy series: expense amounts summed per distinct month
/// string, months sorted lexicographically (e.g. "2024-01"), mapped to
/// integer indices. Rows with a blank month are skipped.
async fn build_revenue_series(pool: &SqlitePool) -> Result<Vec<f64>, sqlx::Error> {
    let items = store::list_expenses(pool).await?;

    let mut months: Vec<String> = Vec::new();
    let mut sums: Vec<f64> = Vec::new();
    for item in &items {
        let month = item.month.trim();
        if month.is_empty() {
            continue;
        }
        match months.iter().position(|m| m == month) {
            Some(idx) => sums[idx] += item.amount,
            None => {
                months.push(month.to_string());
                sums.push(item.amount);
            }
        }
    }

    let mut paired: Vec<(String, f64)> = months.into_iter().zip(sums).collect();
    paired.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(paired.into_iter().map(|(_, v)| v).collect())
}

/// Full revenue intelligence report over the current store.
///
/// Momentum blends the OLS slope of the whole series with growth
/// acceleration (late-half slope minus early-half slope), both normalized by
/// the series mean and scaled into 0-100 around a neutral 50. Sustainability
/// subtracts fraud, inventory-depletion and cash-instability penalties from
/// the momentum index; a score under 60 raises the growth risk flag.
pub async fn analyze_revenue(
    pool: &SqlitePool,
    estimator: &dyn TrendEstimator,
) -> Result<RevenueIntelligence, sqlx::Error> {
    let ys = build_revenue_series(pool).await?;
    if ys.is_empty() {
        return Ok(empty_report());
    }

    let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
    let fit = estimator.fit(&xs, &ys);

    let mid = (ys.len() / 2).max(1);
    let early = estimator.fit(&xs[..mid], &ys[..mid]);
    let late = estimator.fit(&xs[mid..], &ys[mid..]);
    let growth_accel = late.slope - early.slope;

    let ma = moving_average(&ys, 3);

    let base_level = {
        let m = mean(&ys).abs();
        if m == 0.0 {
            1.0
        } else {
            m
        }
    };
    let norm_slope = fit.slope / base_level * 100.0;
    let norm_accel = growth_accel / base_level * 100.0;
    let revenue_momentum_index = (50.0 + norm_slope * 0.7 + norm_accel * 0.3).clamp(0.0, 100.0);

    // 3 abstract steps past the last observed index, one per horizon bucket,
    // with a symmetric 1-sigma residual band
    let sigma = residual_sigma(&xs, &ys, &fit);
    let last_x = xs[xs.len() - 1];
    let points: Vec<ForecastBandPoint> = (1..=3)
        .map(|i| {
            let value = fit.predict(last_x + i as f64);
            ForecastBandPoint {
                step: i,
                value,
                lower: value - sigma,
                upper: value + sigma,
            }
        })
        .collect();

    let fraud = fraud_insights(pool).await?;
    let inventory = inventory_summary(pool).await?;

    let depletion_ratio = if inventory.items.is_empty() {
        0.0
    } else {
        inventory.low_stock_count as f64 / inventory.items.len() as f64 * 100.0
    };
    let cash_instability = if ys.len() > 1 {
        let m = mean(&ys).abs();
        sample_std(&ys) / if m == 0.0 { 1.0 } else { m } * 100.0
    } else {
        0.0
    };

    let fraud_penalty = (fraud.fraud_rate_pct * 0.4).min(30.0);
    let inventory_penalty = (depletion_ratio * 0.3).min(25.0);
    let cash_penalty = (cash_instability * 0.5).min(25.0);

    let sustainability_score = (revenue_momentum_index
        - (fraud_penalty + inventory_penalty + cash_penalty))
        .clamp(0.0, 100.0);

    Ok(RevenueIntelligence {
        revenue_momentum_index: round1(revenue_momentum_index),
        sustainability_score: round1(sustainability_score),
        growth_risk_flag: sustainability_score < 60.0,
        forecast_data: ForecastData {
            horizon_days: vec![30, 60, 90],
            points,
            moving_average: ma
                .into_iter()
                .enumerate()
                .map(|(index, value)| MovingAveragePoint { index, value })
                .collect(),
        },
    })
}

//! Green-grid analytics - average usage and potential savings

use crate::analytics::trend::mean;
use crate::store;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
pub struct GreenGridOverview {
    pub current_usage_kwh: f64,
    pub potential_savings_percent: f64,
}

/// Average stored usage, plus the headroom between the peak reading and the
/// mean as a savings estimate: `(peak - mean) / peak * 100`, clamped to
/// [0,100]. Empty store reads as all-zero.
pub async fn green_grid_overview(pool: &SqlitePool) -> Result<GreenGridOverview, sqlx::Error> {
    let records = store::list_green_grid(pool).await?;
    if records.is_empty() {
        return Ok(GreenGridOverview {
            current_usage_kwh: 0.0,
            potential_savings_percent: 0.0,
        });
    }

    let readings: Vec<f64> = records.iter().map(|r| r.usage_kwh).collect();
    let avg = mean(&readings);
    let peak = readings.iter().copied().fold(f64::MIN, f64::max);

    let potential_savings_percent = if peak > 0.0 {
        ((peak - avg) / peak * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Ok(GreenGridOverview {
        current_usage_kwh: avg,
        potential_savings_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::schema::SchemaRegistry;
    use crate::ingestion::{ingest_file, DatasetType};

    #[tokio::test]
    async fn test_savings_from_peak_headroom() {
        let pool = crate::store::connect("sqlite::memory:").await.unwrap();
        let csv = b"hour,usage_kwh\n00:00,10\n01:00,20\n02:00,30\n";
        ingest_file(
            &pool,
            &SchemaRegistry::new(),
            DatasetType::Energy,
            "g.csv",
            csv,
        )
        .await
        .unwrap();

        let overview = green_grid_overview(&pool).await.unwrap();
        assert_eq!(overview.current_usage_kwh, 20.0);
        // (30 - 20) / 30 * 100
        assert!((overview.potential_savings_percent - 100.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_flat_usage_has_no_savings() {
        let pool = crate::store::connect("sqlite::memory:").await.unwrap();
        let csv = b"hour,usage_kwh\n00:00,15\n01:00,15\n";
        ingest_file(
            &pool,
            &SchemaRegistry::new(),
            DatasetType::Energy,
            "g.csv",
            csv,
        )
        .await
        .unwrap();

        let overview = green_grid_overview(&pool).await.unwrap();
        assert_eq!(overview.potential_savings_percent, 0.0);
    }

    #[tokio::test]
    async fn test_empty_store_is_all_zero() {
        let pool = crate::store::connect("sqlite::memory:").await.unwrap();
        let overview = green_grid_overview(&pool).await.unwrap();
        assert_eq!(overview.current_usage_kwh, 0.0);
        assert_eq!(overview.potential_savings_percent, 0.0);
    }
}

//! Fraud analytics - anomaly counts over stored transaction signals

use crate::store;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
pub struct FraudInsights {
    pub total_transactions: u64,
    pub anomalies_detected: u64,
    pub fraud_rate_pct: f64,
}

/// Count stored transactions and flagged anomalies.
/// `fraud_rate_pct` is unrounded; consumers round at display time.
pub async fn fraud_insights(pool: &SqlitePool) -> Result<FraudInsights, sqlx::Error> {
    let records = store::list_fraud_records(pool).await?;

    let total_transactions = records.len() as u64;
    let anomalies_detected = records.iter().filter(|r| r.is_fraud).count() as u64;
    let fraud_rate_pct = if total_transactions > 0 {
        anomalies_detected as f64 / total_transactions as f64 * 100.0
    } else {
        0.0
    };

    Ok(FraudInsights {
        total_transactions,
        anomalies_detected,
        fraud_rate_pct,
    })
}

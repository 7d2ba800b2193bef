//! Quality scorer - 0-100 reliability score plus issue breakdown
//!
//! Pure function over a normalized batch; always measured post-cleaning so
//! the score reflects what actually gets stored.

use crate::ingestion::schema::SchemaRegistry;
use crate::ingestion::types::{
    Batch, DatasetType, IssueBreakdown, QualityReport, ReliabilityLabel, SchemaVariant, Value,
};
use std::collections::HashSet;

/// Weighted penalty model:
/// score = 100 - 0.3*missing% - 0.2*duplicate% - 0.3*schema_mismatch% - 0.2*outlier%
pub fn score_batch(
    batch: &Batch,
    dataset_type: DatasetType,
    variant: SchemaVariant,
    registry: &SchemaRegistry,
) -> QualityReport {
    if batch.is_empty() || batch.columns.is_empty() {
        return QualityReport {
            data_quality_score: 0.0,
            reliability_label: ReliabilityLabel::Low,
            issue_breakdown: IssueBreakdown {
                missing_value_percent: 100.0,
                duplicate_row_percent: 0.0,
                schema_mismatch_percent: 100.0,
                outlier_percent: 0.0,
                null_critical_field_count: 0,
                schema_variant: SchemaVariant::Unknown,
            },
        };
    }

    let rows = batch.rows.len();
    let cols = batch.columns.len();
    let total_cells = rows * cols;

    let missing_cells = batch
        .rows
        .iter()
        .flat_map(|r| r.iter())
        .filter(|c| c.is_null())
        .count();
    let missing_pct = missing_cells as f64 / total_cells as f64 * 100.0;

    let duplicate_pct = duplicate_rows(batch) as f64 / rows as f64 * 100.0;

    let schema_def = registry.schema(dataset_type);
    let (schema_mismatch_pct, critical_cols): (f64, &[&str]) = match variant {
        SchemaVariant::Current => (0.0, &schema_def.required),
        // Small penalty for relying on the older accepted column set
        SchemaVariant::Legacy => (20.0, &schema_def.legacy),
        SchemaVariant::Unknown => (100.0, &schema_def.required),
    };

    let null_critical_count = critical_cols
        .iter()
        .filter_map(|c| batch.column_index(c))
        .map(|idx| {
            batch
                .rows
                .iter()
                .filter(|r| r.get(idx).map(Value::is_null).unwrap_or(true))
                .count() as u64
        })
        .sum();

    let outlier_pct = outlier_rows(batch) as f64 / rows as f64 * 100.0;

    let score = (100.0
        - missing_pct * 0.3
        - duplicate_pct * 0.2
        - schema_mismatch_pct * 0.3
        - outlier_pct * 0.2)
        .clamp(0.0, 100.0);
    let score = round1(score);

    QualityReport {
        data_quality_score: score,
        reliability_label: ReliabilityLabel::from_score(score),
        issue_breakdown: IssueBreakdown {
            missing_value_percent: round1(missing_pct),
            duplicate_row_percent: round1(duplicate_pct),
            schema_mismatch_percent: round1(schema_mismatch_pct),
            outlier_percent: round1(outlier_pct),
            null_critical_field_count: null_critical_count,
            schema_variant: variant,
        },
    }
}

/// Count rows that fully duplicate an earlier row; the first occurrence is
/// canonical and not counted.
fn duplicate_rows(batch: &Batch) -> usize {
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates = 0;
    for row in &batch.rows {
        let key = format!("{row:?}");
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    duplicates
}

/// Row-level outlier count via Tukey's IQR rule applied per numeric column.
/// A row counts once no matter how many columns flag it; columns with zero
/// IQR are skipped.
fn outlier_rows(batch: &Batch) -> usize {
    let mut flagged = vec![false; batch.rows.len()];

    for (idx, _) in batch.columns.iter().enumerate() {
        if !is_numeric_column(batch, idx) {
            continue;
        }

        let mut values: Vec<f64> = batch
            .rows
            .iter()
            .filter_map(|r| match r.get(idx) {
                Some(Value::Number(n)) => Some(*n),
                _ => None,
            })
            .collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let q1 = percentile(&values, 0.25);
        let q3 = percentile(&values, 0.75);
        let iqr = q3 - q1;
        if iqr == 0.0 {
            continue;
        }
        let lower = q1 - 1.5 * iqr;
        let upper = q3 + 1.5 * iqr;

        for (row_idx, row) in batch.rows.iter().enumerate() {
            if let Some(Value::Number(n)) = row.get(idx) {
                if *n < lower || *n > upper {
                    flagged[row_idx] = true;
                }
            }
        }
    }

    flagged.iter().filter(|f| **f).count()
}

/// A column is numeric when it has at least one value and every non-null
/// cell is a number. Booleans deliberately do not count.
fn is_numeric_column(batch: &Batch, idx: usize) -> bool {
    let mut any = false;
    for row in &batch.rows {
        match row.get(idx) {
            Some(Value::Number(_)) => any = true,
            Some(Value::Null) | None => {}
            _ => return false,
        }
    }
    any
}

/// Percentile with linear interpolation on a sorted sample.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

//! Core data types for the ingestion pipeline
//! Pure data structures with no behavior beyond small accessors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dataset types accepted by the upload interface.
/// Selects which schema, normalizer and store routine apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Inventory,
    Expense,
    Fraud,
    Energy,
}

impl DatasetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Inventory => "inventory",
            DatasetType::Expense => "expense",
            DatasetType::Fraud => "fraud",
            DatasetType::Energy => "energy",
        }
    }

    /// The column whose emptiness disqualifies a row during normalization.
    pub fn identifying_column(&self) -> &'static str {
        match self {
            DatasetType::Inventory => "item_name",
            DatasetType::Expense => "category",
            DatasetType::Fraud => "transaction_id",
            DatasetType::Energy => "hour",
        }
    }
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DatasetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inventory" | "inventory_data" => Ok(DatasetType::Inventory),
            "expense" | "expense_data" => Ok(DatasetType::Expense),
            "fraud" | "fraud_data" => Ok(DatasetType::Fraud),
            "energy" | "energy_data" => Ok(DatasetType::Energy),
            other => Err(format!("unknown dataset type: {other}")),
        }
    }
}

/// A single cell of an uploaded table.
///
/// `Null` covers both absent fields and cells that are empty after trimming,
/// so missing-value accounting sees them the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form used when a cell is stored into a text column.
    /// Null becomes the empty string.
    pub fn to_text_lossy(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Bool(b) => b.to_string(),
        }
    }
}

/// An in-memory tabular batch: ordered column names plus rows of cells
/// aligned to those columns. Produced by the parser, consumed by the
/// pipeline, discarded after storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Batch {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell lookup by column name; absent columns read as Null.
    pub fn cell<'a>(&self, row: &'a [Value], name: &str) -> &'a Value {
        match self.column_index(name) {
            Some(idx) => row.get(idx).unwrap_or(&Value::Null),
            None => &Value::Null,
        }
    }
}

/// Which schema variant an uploaded batch satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    Current,
    Legacy,
    Unknown,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::Current => "current",
            SchemaVariant::Legacy => "legacy",
            SchemaVariant::Unknown => "unknown",
        }
    }
}

/// Reliability bands for the data quality score.
/// High >= 85, Medium >= 65, Low below that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReliabilityLabel {
    High,
    Medium,
    Low,
}

impl ReliabilityLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            ReliabilityLabel::High
        } else if score >= 65.0 {
            ReliabilityLabel::Medium
        } else {
            ReliabilityLabel::Low
        }
    }
}

/// Per-issue percentages behind the quality score.
/// All percent fields are rounded to 1 decimal place (compatibility contract).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueBreakdown {
    pub missing_value_percent: f64,
    pub duplicate_row_percent: f64,
    pub schema_mismatch_percent: f64,
    pub outlier_percent: f64,
    pub null_critical_field_count: u64,
    pub schema_variant: SchemaVariant,
}

/// Reliability scoring payload computed once per ingested batch.
/// Never persisted, only returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub data_quality_score: f64,
    pub reliability_label: ReliabilityLabel,
    pub issue_breakdown: IssueBreakdown,
}

/// Structured result of one ingestion call.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub success: bool,
    pub records_processed: u64,
    pub records_failed: u64,
    pub dataset_type: DatasetType,
    #[serde(flatten)]
    pub quality: QualityReport,
    pub ingested_at: DateTime<Utc>,
}

/// Caller-visible ingestion failures. Nothing is stored when any of these
/// surface; `Storage` additionally means the whole transaction rolled back.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid upload: {0}")]
    InputFormat(String),

    #[error("CSV missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("no valid rows remain after data cleaning")]
    EmptyAfterCleaning,

    #[error("failed to store data: {0}")]
    Storage(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_type_round_trip() {
        for (s, t) in [
            ("inventory", DatasetType::Inventory),
            ("expense", DatasetType::Expense),
            ("fraud", DatasetType::Fraud),
            ("energy", DatasetType::Energy),
        ] {
            assert_eq!(s.parse::<DatasetType>().unwrap(), t);
            assert_eq!(t.as_str(), s);
        }

        // Older upload clients send the *_data suffix
        assert_eq!(
            "inventory_data".parse::<DatasetType>().unwrap(),
            DatasetType::Inventory
        );
        assert!("weather".parse::<DatasetType>().is_err());
    }

    #[test]
    fn test_value_numeric_views() {
        assert_eq!(Value::Number(4.5).as_number(), Some(4.5));
        assert_eq!(Value::Text(" 12 ".to_string()).as_number(), Some(12.0));
        assert_eq!(Value::Text("abc".to_string()).as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
    }

    #[test]
    fn test_reliability_thresholds_at_boundaries() {
        assert_eq!(ReliabilityLabel::from_score(85.0), ReliabilityLabel::High);
        assert_eq!(ReliabilityLabel::from_score(84.9), ReliabilityLabel::Medium);
        assert_eq!(ReliabilityLabel::from_score(65.0), ReliabilityLabel::Medium);
        assert_eq!(ReliabilityLabel::from_score(64.9), ReliabilityLabel::Low);
    }

    #[test]
    fn test_batch_cell_lookup() {
        let mut batch = Batch::new(vec!["a".to_string(), "b".to_string()]);
        batch.rows.push(vec![Value::Number(1.0), Value::Null]);

        let row = &batch.rows[0];
        assert_eq!(batch.cell(row, "a"), &Value::Number(1.0));
        assert!(batch.cell(row, "b").is_null());
        assert!(batch.cell(row, "missing").is_null());
    }
}

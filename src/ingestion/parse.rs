//! Parse functions - turn an uploaded CSV file into a tabular batch

use crate::ingestion::types::{Batch, IngestError, Value};
use tracing::info;

/// Parse one uploaded file into a batch.
///
/// Rejects anything without a `.csv` extension before touching the content,
/// then reads the header row as column names (trimmed, lower-cased) and each
/// record as a row of typed cells.
pub fn parse_upload(filename: &str, content: &[u8]) -> Result<Batch, IngestError> {
    if !filename.ends_with(".csv") {
        return Err(IngestError::InputFormat(
            "only .csv files are allowed".to_string(),
        ));
    }

    let batch = parse_csv(content)?;
    info!(
        "Parsed {} rows x {} columns from {}",
        batch.rows.len(),
        batch.columns.len(),
        filename
    );
    Ok(batch)
}

/// Parse CSV bytes into a batch. Numeric-looking cells become numbers,
/// cells that are empty after trimming become Null, everything else stays
/// text with surrounding whitespace removed.
pub fn parse_csv(content: &[u8]) -> Result<Batch, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::InputFormat(format!("failed to parse CSV file: {e}")))?;

    let columns: Vec<String> = headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(IngestError::InputFormat(
            "CSV file has no header row".to_string(),
        ));
    }

    let mut batch = Batch::new(columns);

    for result in reader.records() {
        let record =
            result.map_err(|e| IngestError::InputFormat(format!("failed to parse CSV file: {e}")))?;

        let mut row = Vec::with_capacity(batch.columns.len());
        for idx in 0..batch.columns.len() {
            row.push(parse_cell(record.get(idx).unwrap_or("")));
        }
        batch.rows.push(row);
    }

    Ok(batch)
}

fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Text(trimmed.to_string()),
    }
}

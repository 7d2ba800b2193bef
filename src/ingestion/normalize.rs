//! Normalizer - alias resolution, type coercion and light cleaning
//!
//! Consumes the raw parsed batch and produces a cleaned batch holding the
//! canonical columns for the dataset type (extra columns are preserved).
//! Never mutates the registry or the original upload.

use crate::ingestion::schema::SchemaRegistry;
use crate::ingestion::types::{Batch, DatasetType, SchemaVariant, Value};
use tracing::debug;

/// Resolve inventory header aliases to canonical names (e.g. `sku` ->
/// `item_name`, `qty` -> `quantity`). A canonical name already present takes
/// priority; otherwise the first alias found in the upload wins.
pub fn resolve_inventory_aliases(batch: &Batch, registry: &SchemaRegistry) -> Batch {
    let mut columns = batch.columns.clone();

    for (canonical, aliases) in registry.inventory_aliases() {
        if columns.iter().any(|c| c == canonical) {
            continue;
        }
        for alias in aliases {
            if let Some(idx) = columns.iter().position(|c| c == alias) {
                debug!("Resolved inventory column alias {} -> {}", alias, canonical);
                columns[idx] = canonical.to_string();
                break;
            }
        }
    }

    Batch {
        columns,
        rows: batch.rows.clone(),
    }
}

/// Normalize a validated batch for its dataset type.
///
/// Legacy headers are renamed to their canonical counterparts first, then
/// per-type coercion applies: strings trimmed, numeric cells coerced with
/// invalid values falling back to 0, and rows missing the identifying field
/// dropped.
pub fn normalize(
    batch: &Batch,
    dataset_type: DatasetType,
    variant: SchemaVariant,
    registry: &SchemaRegistry,
) -> Batch {
    let schema = registry.schema(dataset_type);

    let mut columns = batch.columns.clone();
    if variant == SchemaVariant::Legacy {
        // Legacy and required sets are positionally aligned.
        for (legacy, canonical) in schema.legacy.iter().zip(schema.required.iter()) {
            if let Some(idx) = columns.iter().position(|c| c == legacy) {
                columns[idx] = canonical.to_string();
            }
        }
    }

    let mut out = Batch::new(columns);

    for row in &batch.rows {
        let cells: Vec<Value> = row
            .iter()
            .zip(out.columns.iter())
            .map(|(cell, column)| coerce_cell(cell, column, dataset_type))
            .collect();

        let identifying = out.cell(&cells, dataset_type.identifying_column());
        if identifying.is_null() {
            debug!(
                "Dropping row with empty {} during {} normalization",
                dataset_type.identifying_column(),
                dataset_type
            );
            continue;
        }

        // Inventory rows additionally need a category to be usable.
        if dataset_type == DatasetType::Inventory && out.cell(&cells, "category").is_null() {
            continue;
        }

        out.rows.push(cells);
    }

    out
}

fn coerce_cell(cell: &Value, column: &str, dataset_type: DatasetType) -> Value {
    match dataset_type {
        DatasetType::Inventory => match column {
            "quantity" => integer_or_zero(cell),
            "price" => number_or_zero(cell),
            "item_name" | "category" | "vendor" => trimmed_text(cell),
            _ => cell.clone(),
        },
        DatasetType::Expense => match column {
            "amount" => number_or_zero(cell),
            "category" | "month" => trimmed_text(cell),
            _ => cell.clone(),
        },
        DatasetType::Fraud => match column {
            "amount" => integer_or_zero(cell),
            "is_fraud" => Value::Bool(coerce_bool(cell)),
            "transaction_id" => trimmed_text(cell),
            _ => cell.clone(),
        },
        DatasetType::Energy => match column {
            "usage_kwh" => number_or_zero(cell),
            "hour" => trimmed_text(cell),
            _ => cell.clone(),
        },
    }
}

/// Trim text cells; anything that trims to empty becomes Null. Non-text
/// cells (e.g. a numeric transaction id) pass through unchanged.
fn trimmed_text(cell: &Value) -> Value {
    match cell {
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::Text(trimmed.to_string())
            }
        }
        other => other.clone(),
    }
}

fn number_or_zero(cell: &Value) -> Value {
    Value::Number(cell.as_number().unwrap_or(0.0))
}

fn integer_or_zero(cell: &Value) -> Value {
    Value::Number(cell.as_number().unwrap_or(0.0).trunc())
}

fn coerce_bool(cell: &Value) -> bool {
    match cell {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        Value::Text(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Null => false,
    }
}

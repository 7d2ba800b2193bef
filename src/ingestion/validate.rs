//! Schema validator - decides which schema variant an uploaded batch satisfies

use crate::ingestion::schema::SchemaDef;
use crate::ingestion::types::{Batch, SchemaVariant};

/// Outcome of a schema check. `missing` is only populated when neither
/// variant is satisfied, and then lists the missing *required* columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub ok: bool,
    pub variant: SchemaVariant,
    pub missing: Vec<String>,
}

/// Check an uploaded batch against a schema definition.
///
/// Column names are expected lower-cased and trimmed (the parser does this).
/// Checks the preferred column set first, then the legacy set; on failure
/// reports the still-missing required columns, sorted. No side effects.
pub fn validate_schema(batch: &Batch, schema: &SchemaDef) -> Validation {
    if schema.required.iter().all(|c| batch.has_column(c)) {
        return Validation {
            ok: true,
            variant: SchemaVariant::Current,
            missing: Vec::new(),
        };
    }

    if schema.legacy.iter().all(|c| batch.has_column(c)) {
        return Validation {
            ok: true,
            variant: SchemaVariant::Legacy,
            missing: Vec::new(),
        };
    }

    let mut missing: Vec<String> = schema
        .required
        .iter()
        .filter(|c| !batch.has_column(c))
        .map(|c| c.to_string())
        .collect();
    missing.sort();

    Validation {
        ok: false,
        variant: SchemaVariant::Unknown,
        missing,
    }
}

//! Lucent backend - business data ingestion and analytics engine
//!
//! CSV uploads flow through the ingestion pipeline (parse, validate,
//! normalize, quality-score, persist) into the SQLite record store; the
//! analytics modules compute reports over whatever is currently stored.

pub mod analytics;
pub mod ingestion;
pub mod store;

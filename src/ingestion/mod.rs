//! Ingestion pipeline - parse, validate, normalize, score and store uploads

pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod quality;
pub mod schema;
pub mod types;
pub mod validate;

pub use pipeline::ingest_file;
pub use types::*;

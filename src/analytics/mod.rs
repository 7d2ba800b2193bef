//! Request-time analytics over the record store
//!
//! Every analyzer recomputes from stored rows on each call; nothing here is
//! cached or persisted.

pub mod catalog;
pub mod energy;
pub mod expense;
pub mod fraud;
pub mod inventory;
pub mod revenue;
pub mod risk;
pub mod simulation;
pub mod trend;

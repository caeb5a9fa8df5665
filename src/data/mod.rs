//! Data ingestion and record store layer.

pub mod faers;
pub mod store;

pub use store::{Case, DrugRecord, OutcomeRecord, ReactionRecord, RecordStore};

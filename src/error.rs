//! Boundary errors raised while assembling the record store.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Faults detected once, when raw tables are adapted into a [`crate::data::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table} table is missing required column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

//! FAERS data-quality surveillance and disproportionality signal detection.

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod quality;
pub mod signals;

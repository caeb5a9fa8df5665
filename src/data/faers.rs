//! FAERS quarterly ASCII loading.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use polars::prelude::{CsvEncoding, CsvParseOptions, CsvReadOptions, DataFrame, SerReader};
use regex::Regex;
use tracing::{info, instrument};
use walkdir::WalkDir;

use crate::{config::Settings, data::store::RecordStore};

/// The four FAERS tables the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Demographics,
    Drug,
    Reaction,
    Outcome,
}

impl Table {
    fn prefix(self) -> &'static str {
        match self {
            Self::Demographics => "DEMO",
            Self::Drug => "DRUG",
            Self::Reaction => "REAC",
            Self::Outcome => "OUTC",
        }
    }
}

/// Resolved file locations for one FAERS quarter.
#[derive(Debug, Clone)]
pub struct QuarterFiles {
    pub quarter: String,
    pub demographics: PathBuf,
    pub drug: PathBuf,
    pub reaction: PathBuf,
    pub outcome: PathBuf,
}

/// Locate the extracted ASCII files under `root`.
///
/// With no `quarter` (e.g. `25Q3`) the most recent quarter that has all four
/// tables is chosen.
pub fn discover(root: &Path, quarter: Option<&str>) -> Result<QuarterFiles> {
    let pattern = Regex::new(r"(?i)^(DEMO|DRUG|REAC|OUTC)(\d{2}Q[1-4])\.txt$")?;
    let mut found: Vec<(String, String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(caps) = pattern.captures(&name) {
            found.push((
                caps[1].to_ascii_uppercase(),
                caps[2].to_ascii_uppercase(),
                entry.path().to_path_buf(),
            ));
        }
    }

    let mut quarters: Vec<String> = found.iter().map(|(_, q, _)| q.clone()).collect();
    quarters.sort_by_key(|q| quarter_order(q));
    quarters.dedup();

    let wanted = quarter.map(str::to_ascii_uppercase);
    let lookup = |quarter: &str, table: Table| {
        found
            .iter()
            .find(|(kind, q, _)| kind == table.prefix() && q == quarter)
            .map(|(_, _, path)| path.clone())
    };

    for candidate in quarters.iter().rev() {
        if wanted.as_ref().is_some_and(|w| w != candidate) {
            continue;
        }
        if let (Some(demographics), Some(drug), Some(reaction), Some(outcome)) = (
            lookup(candidate, Table::Demographics),
            lookup(candidate, Table::Drug),
            lookup(candidate, Table::Reaction),
            lookup(candidate, Table::Outcome),
        ) {
            return Ok(QuarterFiles {
                quarter: candidate.clone(),
                demographics,
                drug,
                reaction,
                outcome,
            });
        }
    }

    Err(anyhow!(
        "no complete FAERS quarter{} found under {}",
        wanted.map(|w| format!(" {w}")).unwrap_or_default(),
        root.display()
    ))
}

fn quarter_order(quarter: &str) -> (u32, u32) {
    let year = quarter.get(0..2).and_then(|y| y.parse().ok()).unwrap_or(0);
    let q = quarter.get(3..4).and_then(|q| q.parse().ok()).unwrap_or(0);
    (year, q)
}

/// Read one `$`-delimited FAERS table with every column kept as text.
pub fn read_table(path: &Path, n_rows: Option<usize>) -> Result<DataFrame> {
    let parse_options = CsvParseOptions::default()
        .with_separator(b'$')
        .with_encoding(CsvEncoding::LossyUtf8)
        .with_truncate_ragged_lines(true);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_n_rows(n_rows)
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("create reader for {}", path.display()))?
        .finish()
        .with_context(|| format!("read {}", path.display()))?;
    Ok(df)
}

/// Load a quarter into a record store, sampling the first `sample_size` cases.
#[instrument(skip(settings))]
pub fn load_store(settings: &Settings, quarter: Option<&str>) -> Result<RecordStore> {
    let files = discover(&settings.data_dir, quarter)?;
    info!(quarter = %files.quarter, sample = settings.sample_size, "loading FAERS tables");

    let demo = read_table(&files.demographics, Some(settings.sample_size))?;
    let drug = read_table(&files.drug, None)?;
    let reac = read_table(&files.reaction, None)?;
    let outc = read_table(&files.outcome, None)?;

    let store = RecordStore::from_frames(&demo, &drug, &reac, &outc)
        .with_context(|| format!("adapt FAERS {} tables", files.quarter))?;
    Ok(store)
}

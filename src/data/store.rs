//! In-memory record store adapted from the four FAERS tables.
//!
//! Raw frames are validated and converted once; every analysis afterwards works on
//! plain typed rows and never touches `polars` again.

use chrono::NaiveDate;
use polars::prelude::{DataFrame, DataType, Series};
use serde::Serialize;
use tracing::info;

use crate::error::StoreError;

/// FAERS column names addressed by the adapter.
pub mod columns {
    pub const PRIMARY_ID: &str = "primaryid";
    pub const CASE_ID: &str = "caseid";
    pub const RECEIPT_DATE: &str = "fda_dt";
    pub const EVENT_DATE: &str = "event_dt";
    pub const AGE: &str = "age";
    pub const SEX: &str = "sex";
    pub const REPORTER_COUNTRY: &str = "reporter_country";
    pub const OCCUPATION: &str = "occp_cod";
    pub const REPORT_CODE: &str = "rept_cod";
    pub const DRUG_NAME: &str = "drugname";
    pub const ROLE_CODE: &str = "role_cod";
    pub const REACTION: &str = "pt";
    pub const OUTCOME_CODE: &str = "outc_cod";
}

/// Role code marking a primary suspect drug.
pub const PRIMARY_SUSPECT: &str = "PS";

/// Join key of one report version: `(primaryid, caseid)`.
///
/// FAERS may carry several versions of a case in a quarter. When a table has no
/// `primaryid` column the first element is `None` and rows join on `caseid` alone.
pub type ReportKey<'a> = (Option<&'a str>, &'a str);

fn report_key<'a>(
    primary_id: &'a Option<String>,
    case_id: &'a Option<String>,
) -> Option<ReportKey<'a>> {
    case_id.as_deref().map(|case| (primary_id.as_deref(), case))
}

/// One adverse-event report from the demographics table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Case {
    pub primary_id: Option<String>,
    pub case_id: Option<String>,
    pub receipt_date: Option<String>,
    pub event_date: Option<String>,
    pub age: Option<f64>,
    pub sex: Option<String>,
    pub reporter_country: Option<String>,
    pub occupation: Option<String>,
    pub report_code: Option<String>,
}

impl Case {
    /// Receipt date as a calendar day; malformed values are treated as unobserved.
    pub fn receipt_day(&self) -> Option<NaiveDate> {
        self.receipt_date.as_deref().and_then(parse_faers_date)
    }

    pub fn report_key(&self) -> Option<ReportKey<'_>> {
        report_key(&self.primary_id, &self.case_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrugRecord {
    pub primary_id: Option<String>,
    pub case_id: Option<String>,
    pub drug_name: Option<String>,
    pub role_code: Option<String>,
}

impl DrugRecord {
    pub fn is_primary_suspect(&self) -> bool {
        self.role_code.as_deref() == Some(PRIMARY_SUSPECT)
    }

    pub fn report_key(&self) -> Option<ReportKey<'_>> {
        report_key(&self.primary_id, &self.case_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReactionRecord {
    pub primary_id: Option<String>,
    pub case_id: Option<String>,
    pub reaction: Option<String>,
}

impl ReactionRecord {
    pub fn report_key(&self) -> Option<ReportKey<'_>> {
        report_key(&self.primary_id, &self.case_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub primary_id: Option<String>,
    pub case_id: Option<String>,
    pub outcome_code: Option<String>,
}

impl OutcomeRecord {
    pub fn report_key(&self) -> Option<ReportKey<'_>> {
        report_key(&self.primary_id, &self.case_id)
    }
}

/// Missing-value count of a single demographics column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub column: String,
    pub missing: usize,
}

/// Read-only snapshot shared by every analysis.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    pub cases: Vec<Case>,
    pub drugs: Vec<DrugRecord>,
    pub reactions: Vec<ReactionRecord>,
    pub outcomes: Vec<OutcomeRecord>,
}

impl RecordStore {
    /// Assemble a store from already-typed rows.
    pub fn new(
        cases: Vec<Case>,
        drugs: Vec<DrugRecord>,
        reactions: Vec<ReactionRecord>,
        outcomes: Vec<OutcomeRecord>,
    ) -> Self {
        Self {
            cases,
            drugs,
            reactions,
            outcomes,
        }
    }

    /// Adapt the four parsed FAERS tables, failing once if a required column is absent.
    pub fn from_frames(
        demo: &DataFrame,
        drug: &DataFrame,
        reac: &DataFrame,
        outc: &DataFrame,
    ) -> Result<Self, StoreError> {
        use columns::*;

        let primary_ids = optional_text_column(demo, PRIMARY_ID)?;
        let case_ids = text_column(demo, "demographics", CASE_ID)?;
        let receipt = text_column(demo, "demographics", RECEIPT_DATE)?;
        let event = text_column(demo, "demographics", EVENT_DATE)?;
        let ages = numeric_column(demo, "demographics", AGE)?;
        let sexes = text_column(demo, "demographics", SEX)?;
        let countries = text_column(demo, "demographics", REPORTER_COUNTRY)?;
        let occupations = text_column(demo, "demographics", OCCUPATION)?;
        let report_codes = text_column(demo, "demographics", REPORT_CODE)?;

        let mut cases = Vec::with_capacity(demo.height());
        for idx in 0..demo.height() {
            cases.push(Case {
                primary_id: primary_ids[idx].clone(),
                case_id: case_ids[idx].clone(),
                receipt_date: receipt[idx].clone(),
                event_date: event[idx].clone(),
                age: ages[idx],
                sex: sexes[idx].clone(),
                reporter_country: countries[idx].clone(),
                occupation: occupations[idx].clone(),
                report_code: report_codes[idx].clone(),
            });
        }

        let drug_primary = optional_text_column(drug, PRIMARY_ID)?;
        let drug_cases = text_column(drug, "drug", CASE_ID)?;
        let drug_names = text_column(drug, "drug", DRUG_NAME)?;
        let roles = text_column(drug, "drug", ROLE_CODE)?;
        let drugs = drug_primary
            .into_iter()
            .zip(drug_cases)
            .zip(drug_names)
            .zip(roles)
            .map(|(((primary_id, case_id), drug_name), role_code)| DrugRecord {
                primary_id,
                case_id,
                drug_name,
                role_code,
            })
            .collect();

        let reac_primary = optional_text_column(reac, PRIMARY_ID)?;
        let reac_cases = text_column(reac, "reaction", CASE_ID)?;
        let terms = text_column(reac, "reaction", REACTION)?;
        let reactions = reac_primary
            .into_iter()
            .zip(reac_cases)
            .zip(terms)
            .map(|((primary_id, case_id), reaction)| ReactionRecord {
                primary_id,
                case_id,
                reaction,
            })
            .collect();

        let outc_primary = optional_text_column(outc, PRIMARY_ID)?;
        let outc_cases = text_column(outc, "outcome", CASE_ID)?;
        let codes = text_column(outc, "outcome", OUTCOME_CODE)?;
        let outcomes = outc_primary
            .into_iter()
            .zip(outc_cases)
            .zip(codes)
            .map(|((primary_id, case_id), outcome_code)| OutcomeRecord {
                primary_id,
                case_id,
                outcome_code,
            })
            .collect();

        let store = Self::new(cases, drugs, reactions, outcomes);
        info!(
            cases = store.cases.len(),
            drugs = store.drugs.len(),
            reactions = store.reactions.len(),
            outcomes = store.outcomes.len(),
            "record store assembled"
        );
        Ok(store)
    }

    /// Missing-value counts of the adapted demographics columns.
    ///
    /// Uses the same rule as every other check: blank text and non-numeric ages
    /// count as missing.
    pub fn demographics_profile(&self) -> Vec<ColumnProfile> {
        profile_cases(&self.cases)
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Parse a FAERS `YYYYMMDD` date; partial or malformed dates yield `None`.
pub fn parse_faers_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

fn find_column<'a>(
    df: &'a DataFrame,
    table: &'static str,
    column: &'static str,
) -> Result<&'a Series, StoreError> {
    df.get_columns()
        .iter()
        .find(|series| series.name().eq_ignore_ascii_case(column))
        .ok_or(StoreError::MissingColumn { table, column })
}

/// Like [`text_column`], but an absent column yields all-missing values.
fn optional_text_column(
    df: &DataFrame,
    column: &'static str,
) -> Result<Vec<Option<String>>, StoreError> {
    match text_column(df, "", column) {
        Err(StoreError::MissingColumn { .. }) => Ok(vec![None; df.height()]),
        other => other,
    }
}

fn text_column(
    df: &DataFrame,
    table: &'static str,
    column: &'static str,
) -> Result<Vec<Option<String>>, StoreError> {
    let series = find_column(df, table, column)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.and_then(non_blank))
        .collect();
    Ok(values)
}

fn numeric_column(
    df: &DataFrame,
    table: &'static str,
    column: &'static str,
) -> Result<Vec<Option<f64>>, StoreError> {
    let series = find_column(df, table, column)?.cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect();
    Ok(values)
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn profile_cases(cases: &[Case]) -> Vec<ColumnProfile> {
    use columns::*;

    let count = |present: fn(&Case) -> bool| cases.iter().filter(|c| !present(c)).count();
    [
        (CASE_ID, count(|c| c.case_id.is_some())),
        (RECEIPT_DATE, count(|c| c.receipt_date.is_some())),
        (EVENT_DATE, count(|c| c.event_date.is_some())),
        (AGE, count(|c| c.age.is_some())),
        (SEX, count(|c| c.sex.is_some())),
        (REPORTER_COUNTRY, count(|c| c.reporter_country.is_some())),
        (OCCUPATION, count(|c| c.occupation.is_some())),
        (REPORT_CODE, count(|c| c.report_code.is_some())),
    ]
    .into_iter()
    .map(|(column, missing)| ColumnProfile {
        column: column.to_string(),
        missing,
    })
    .collect()
}

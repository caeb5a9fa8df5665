//! Runtime configuration utilities for faers-surveillance.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Folder holding the extracted FAERS ASCII files.
    pub data_dir: PathBuf,
    /// Root folder for analytic outputs.
    pub outputs_dir: PathBuf,
    /// Number of demographics rows loaded into the snapshot.
    pub sample_size: usize,
    /// Threshold preset used when no explicit overrides are given.
    pub signal_mode: AnalysisMode,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let sample_size = env::var("SAMPLE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50_000);
        let signal_mode = env::var("SIGNAL_MODE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            data_dir,
            outputs_dir,
            sample_size,
            signal_mode,
        })
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

/// Named threshold presets for the disproportionality engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Relaxed exploratory thresholds over a 20 x 30 grid.
    #[default]
    Demo,
    /// Regulatory-leaning thresholds over a 50 x 100 grid.
    Standard,
}

impl AnalysisMode {
    pub fn signal_config(self) -> SignalConfig {
        match self {
            Self::Demo => SignalConfig::demo(),
            Self::Standard => SignalConfig::standard(),
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "standard" => Ok(Self::Standard),
            other => Err(anyhow::anyhow!("unknown signal mode `{other}`")),
        }
    }
}

/// Knobs of the disproportionality engine.
///
/// The top-N / top-M scope bounds the search to `top_drug_count * top_reaction_count`
/// pairs, so associations outside the most frequently reported drugs and reactions
/// are never evaluated. Raising the counts trades runtime for recall. Values are
/// used exactly as given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub top_drug_count: usize,
    pub top_reaction_count: usize,
    pub min_cases: u64,
    pub prr_threshold: f64,
    pub chi2_threshold: f64,
}

impl SignalConfig {
    pub fn demo() -> Self {
        Self {
            top_drug_count: 20,
            top_reaction_count: 30,
            min_cases: 2,
            prr_threshold: 1.3,
            chi2_threshold: 1.5,
        }
    }

    pub fn standard() -> Self {
        Self {
            top_drug_count: 50,
            top_reaction_count: 100,
            min_cases: 3,
            prr_threshold: 2.0,
            chi2_threshold: 4.0,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::demo()
    }
}

/// Settings for the daily volume anomaly detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// A day is anomalous when `|z|` is strictly greater than this value.
    pub z_threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self { z_threshold: 3.0 }
    }
}

/// Per-knob overrides applied on top of a preset.
#[derive(Debug, Clone, Default, clap::Args, Deserialize)]
pub struct SignalOverrides {
    /// Threshold preset to start from.
    #[arg(long, value_enum)]
    pub mode: Option<AnalysisMode>,
    /// Number of most-reported drugs scanned.
    #[arg(long)]
    pub top_drugs: Option<usize>,
    /// Number of most-reported reactions scanned.
    #[arg(long)]
    pub top_reactions: Option<usize>,
    /// Minimum co-occurrence rows for a pair to be evaluated.
    #[arg(long)]
    pub min_cases: Option<u64>,
    /// Minimum PRR for a signal.
    #[arg(long)]
    pub prr: Option<f64>,
    /// Minimum chi-square for a signal.
    #[arg(long)]
    pub chi2: Option<f64>,
}

impl SignalOverrides {
    /// Resolve against `default_mode` when no preset was chosen explicitly.
    pub fn resolve(&self, default_mode: AnalysisMode) -> SignalConfig {
        let base = self.mode.unwrap_or(default_mode).signal_config();
        SignalConfig {
            top_drug_count: self.top_drugs.unwrap_or(base.top_drug_count),
            top_reaction_count: self.top_reactions.unwrap_or(base.top_reaction_count),
            min_cases: self.min_cases.unwrap_or(base.min_cases),
            prr_threshold: self.prr.unwrap_or(base.prr_threshold),
            chi2_threshold: self.chi2.unwrap_or(base.chi2_threshold),
        }
    }
}

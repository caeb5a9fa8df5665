//! 2x2 contingency statistics: PRR, chi-square and reporting odds ratio.

use serde::Serialize;

/// Report-level contingency table for one drug/reaction pair.
///
/// | | reaction | other reactions |
/// |---|---|---|
/// | drug | `a` | `b` |
/// | other drugs | `c` | `d` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    /// Derive the table from precomputed margins.
    ///
    /// Returns `None` when `b`, `c` or `d` would be zero or negative, in which case
    /// the PRR is undefined.
    pub fn from_margins(
        a: u64,
        drug_total: u64,
        reaction_total: u64,
        total_rows: u64,
    ) -> Option<Self> {
        let (a_i, drug_i, reaction_i, total_i) = (
            a as i128,
            drug_total as i128,
            reaction_total as i128,
            total_rows as i128,
        );
        let b = drug_i - a_i;
        let c = reaction_i - a_i;
        let d = total_i - a_i - b - c;
        if b <= 0 || c <= 0 || d <= 0 {
            return None;
        }
        Some(Self {
            a,
            b: b as u64,
            c: c as u64,
            d: d as u64,
        })
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// `(a / b) / (c / d)`.
    pub fn prr(&self) -> f64 {
        let (a, b, c, d) = self.as_f64();
        (a / b) / (c / d)
    }

    /// Pearson chi-square scaled by `n_total`; a zero margin product yields 0.
    pub fn chi_square(&self, n_total: f64) -> f64 {
        let (a, b, c, d) = self.as_f64();
        let denominator = (a + b) * (c + d) * (a + c) * (b + d);
        if denominator == 0.0 {
            return 0.0;
        }
        let cross = a * d - b * c;
        n_total * cross * cross / denominator
    }

    /// Reporting odds ratio with a 95% confidence interval.
    pub fn ror_with_ci(&self) -> (f64, f64, f64) {
        let (a, b, c, d) = self.as_f64();
        let ror = (a * d) / (b * c);
        if self.a == 0 {
            return (ror, 0.0, f64::INFINITY);
        }
        let se = ((1.0 / a) + (1.0 / b) + (1.0 / c) + (1.0 / d)).sqrt();
        let log_ror = ror.ln();
        let ci_low = (log_ror - 1.96 * se).exp();
        let ci_high = (log_ror + 1.96 * se).exp();
        (ror, ci_low, ci_high)
    }

    fn as_f64(&self) -> (f64, f64, f64, f64) {
        (self.a as f64, self.b as f64, self.c as f64, self.d as f64)
    }
}

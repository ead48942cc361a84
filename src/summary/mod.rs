//! Summary statistics for feature tables.

use crate::data::FeatureTable;
use serde::{Deserialize, Serialize};

/// Summary of a feature table's shape and per-sample frequencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    /// Number of samples.
    pub n_samples: usize,
    /// Number of features.
    pub n_features: usize,
    /// Number of non-zero entries.
    pub nnz: usize,
    /// Fraction of entries that are non-zero.
    pub density: f64,
    /// Sum of all values in the table.
    pub total_frequency: f64,
    /// Total frequency per sample.
    pub sample_frequencies: Vec<f64>,
    /// Mean sample frequency.
    pub mean_frequency: f64,
    /// Median sample frequency.
    pub median_frequency: f64,
    /// Minimum sample frequency.
    pub min_frequency: f64,
    /// Maximum sample frequency.
    pub max_frequency: f64,
}

impl std::fmt::Display for TableSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Feature Table Summary")?;
        writeln!(f, "  Samples:  {}", self.n_samples)?;
        writeln!(f, "  Features: {}", self.n_features)?;
        writeln!(f, "  Non-zero entries: {}", self.nnz)?;
        writeln!(f, "  Density:  {:.4}", self.density)?;
        writeln!(f, "  Total frequency:  {:.1}", self.total_frequency)?;
        writeln!(f, "  Sample frequency (mean):   {:.1}", self.mean_frequency)?;
        writeln!(f, "  Sample frequency (median): {:.1}", self.median_frequency)?;
        writeln!(f, "  Sample frequency (min):    {:.1}", self.min_frequency)?;
        writeln!(f, "  Sample frequency (max):    {:.1}", self.max_frequency)?;
        Ok(())
    }
}

/// Summarize a feature table.
pub fn summarize_table(table: &FeatureTable) -> TableSummary {
    let sample_frequencies = table.sample_frequencies();
    let n_samples = sample_frequencies.len();
    let n_features = table.n_features();

    if n_samples == 0 || n_features == 0 {
        return TableSummary {
            n_samples,
            n_features,
            nnz: 0,
            density: 0.0,
            total_frequency: 0.0,
            sample_frequencies,
            mean_frequency: 0.0,
            median_frequency: 0.0,
            min_frequency: 0.0,
            max_frequency: 0.0,
        };
    }

    let total_frequency: f64 = sample_frequencies.iter().sum();
    let mean_frequency = total_frequency / n_samples as f64;

    let mut sorted = sample_frequencies.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_frequency = if n_samples % 2 == 0 {
        (sorted[n_samples / 2 - 1] + sorted[n_samples / 2]) / 2.0
    } else {
        sorted[n_samples / 2]
    };

    TableSummary {
        n_samples,
        n_features,
        nnz: table.nnz(),
        density: table.nnz() as f64 / (n_samples * n_features) as f64,
        total_frequency,
        min_frequency: sorted[0],
        max_frequency: sorted[n_samples - 1],
        sample_frequencies,
        mean_frequency,
        median_frequency,
    }
}

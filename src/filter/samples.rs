//! Sample-level filtering of feature tables.
//!
//! Mirrors the usual sample-selection criteria for amplicon feature tables:
//! membership in a metadata file, a predicate over metadata columns, bounds on
//! total sample frequency, and bounds on observed feature counts. An empty
//! result is a valid table, not an error, so that downstream steps (sequence
//! filtering in particular) always see the filtered table.

use crate::data::{FeatureTable, Metadata, WhereClause};
use crate::error::{FilterError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keep the table's samples whose ID appears in the metadata.
///
/// Metadata describing samples absent from the table is permitted; those IDs
/// are ignored. With `exclude_ids` the selection is inverted: samples named
/// in the metadata are removed instead of retained.
pub fn filter_samples_by_metadata(
    table: &FeatureTable,
    metadata: &Metadata,
    exclude_ids: bool,
) -> Result<FeatureTable> {
    let ids = metadata.id_set();
    let keep_indices: Vec<usize> = table
        .sample_ids()
        .iter()
        .enumerate()
        .filter(|(_, sid)| ids.contains(sid.as_str()) != exclude_ids)
        .map(|(i, _)| i)
        .collect();

    debug!(
        "metadata filter: {} of {} samples retained",
        keep_indices.len(),
        table.n_samples()
    );
    table.subset_samples(&keep_indices)
}

/// Keep the table's samples whose metadata satisfies the clause.
pub fn filter_samples_where(
    table: &FeatureTable,
    metadata: &Metadata,
    clause: &WhereClause,
) -> Result<FeatureTable> {
    let matching = metadata.ids_where(clause)?;
    let matching: HashSet<&str> = matching.iter().map(String::as_str).collect();

    let keep_indices: Vec<usize> = table
        .sample_ids()
        .iter()
        .enumerate()
        .filter(|(_, sid)| matching.contains(sid.as_str()))
        .map(|(i, _)| i)
        .collect();

    table.subset_samples(&keep_indices)
}

/// Keep samples whose total frequency falls within the given bounds.
pub fn filter_samples_by_frequency(
    table: &FeatureTable,
    min_frequency: f64,
    max_frequency: Option<f64>,
) -> Result<FeatureTable> {
    if min_frequency < 0.0 {
        return Err(FilterError::InvalidParameter(
            "min_frequency must be non-negative".to_string(),
        ));
    }
    if let Some(max) = max_frequency {
        if max < min_frequency {
            return Err(FilterError::InvalidParameter(
                "max_frequency cannot be less than min_frequency".to_string(),
            ));
        }
    }

    let freqs = table.sample_frequencies();
    let max = max_frequency.unwrap_or(f64::INFINITY);

    let keep_indices: Vec<usize> = freqs
        .iter()
        .enumerate()
        .filter(|(_, &f)| f >= min_frequency && f <= max)
        .map(|(i, _)| i)
        .collect();

    table.subset_samples(&keep_indices)
}

/// Keep samples whose observed (non-zero) feature count falls within the
/// given bounds.
pub fn filter_samples_by_feature_count(
    table: &FeatureTable,
    min_features: usize,
    max_features: Option<usize>,
) -> Result<FeatureTable> {
    if let Some(max) = max_features {
        if max < min_features {
            return Err(FilterError::InvalidParameter(
                "max_features cannot be less than min_features".to_string(),
            ));
        }
    }

    let counts = table.sample_feature_counts();
    let max = max_features.unwrap_or(usize::MAX);

    let keep_indices: Vec<usize> = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c >= min_features && c <= max)
        .map(|(i, _)| i)
        .collect();

    table.subset_samples(&keep_indices)
}

/// Drop features with no remaining non-zero values.
///
/// With zero samples left, every feature is empty and the result has zero
/// features as well.
pub fn drop_empty_features(table: &FeatureTable) -> Result<FeatureTable> {
    let freqs = table.feature_frequencies();
    let keep_indices: Vec<usize> = freqs
        .iter()
        .enumerate()
        .filter(|(_, &f)| f > 0.0)
        .map(|(i, _)| i)
        .collect();

    if keep_indices.len() == table.n_features() {
        return Ok(table.clone());
    }
    debug!(
        "dropping {} empty features",
        table.n_features() - keep_indices.len()
    );
    table.subset_features(&keep_indices)
}

fn default_filter_empty_features() -> bool {
    true
}

/// Combined sample-selection criteria.
///
/// All criteria are optional; the defaults keep every sample and drop
/// features left empty by the selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleFilter {
    /// Minimum total sample frequency.
    #[serde(default)]
    pub min_frequency: f64,
    /// Maximum total sample frequency.
    #[serde(default)]
    pub max_frequency: Option<f64>,
    /// Minimum observed feature count.
    #[serde(default)]
    pub min_features: usize,
    /// Maximum observed feature count.
    #[serde(default)]
    pub max_features: Option<usize>,
    /// Predicate over metadata columns, e.g. `body_site=gut`.
    #[serde(default)]
    pub where_clause: Option<String>,
    /// Remove rather than retain the samples named in the metadata.
    #[serde(default)]
    pub exclude_ids: bool,
    /// Drop features with no non-zero values after sample filtering.
    #[serde(default = "default_filter_empty_features")]
    pub filter_empty_features: bool,
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self {
            min_frequency: 0.0,
            max_frequency: None,
            min_features: 0,
            max_features: None,
            where_clause: None,
            exclude_ids: false,
            filter_empty_features: true,
        }
    }
}

/// Apply the combined criteria to a table.
///
/// The metadata criterion (and the where clause) only apply when metadata is
/// supplied; a where clause without metadata is an error.
pub fn filter_samples(
    table: &FeatureTable,
    metadata: Option<&Metadata>,
    filter: &SampleFilter,
) -> Result<FeatureTable> {
    let mut filtered = match metadata {
        Some(meta) => filter_samples_by_metadata(table, meta, filter.exclude_ids)?,
        None => table.clone(),
    };

    if let Some(clause) = &filter.where_clause {
        let meta = metadata.ok_or_else(|| {
            FilterError::InvalidParameter(
                "a where clause requires metadata".to_string(),
            )
        })?;
        let clause = WhereClause::parse(clause)?;
        filtered = filter_samples_where(&filtered, meta, &clause)?;
    }

    if filter.min_frequency > 0.0 || filter.max_frequency.is_some() {
        filtered =
            filter_samples_by_frequency(&filtered, filter.min_frequency, filter.max_frequency)?;
    }

    if filter.min_features > 0 || filter.max_features.is_some() {
        filtered =
            filter_samples_by_feature_count(&filtered, filter.min_features, filter.max_features)?;
    }

    if filter.filter_empty_features {
        filtered = drop_empty_features(&filtered)?;
    }

    Ok(filtered)
}

/// Result of sample filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleFilterResult {
    /// Number of samples before filtering.
    pub n_samples_before: usize,
    /// Number of samples after filtering.
    pub n_samples_after: usize,
    /// IDs of removed samples.
    pub removed_samples: Vec<String>,
    /// Number of features before filtering.
    pub n_features_before: usize,
    /// Number of features after filtering.
    pub n_features_after: usize,
}

impl std::fmt::Display for SampleFilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sample Filter Result")?;
        writeln!(f, "  Samples before:  {}", self.n_samples_before)?;
        writeln!(f, "  Samples after:   {}", self.n_samples_after)?;
        writeln!(f, "  Samples removed: {}", self.removed_samples.len())?;
        if !self.removed_samples.is_empty() {
            writeln!(f, "  Removed: {:?}", self.removed_samples)?;
        }
        writeln!(f, "  Features before: {}", self.n_features_before)?;
        writeln!(f, "  Features after:  {}", self.n_features_after)?;
        Ok(())
    }
}

/// Apply the combined criteria, reporting what was filtered.
pub fn filter_samples_with_stats(
    table: &FeatureTable,
    metadata: Option<&Metadata>,
    filter: &SampleFilter,
) -> Result<(FeatureTable, SampleFilterResult)> {
    let filtered = filter_samples(table, metadata, filter)?;

    let kept: HashSet<&str> = filtered.sample_ids().iter().map(String::as_str).collect();
    let removed_samples: Vec<String> = table
        .sample_ids()
        .iter()
        .filter(|sid| !kept.contains(sid.as_str()))
        .cloned()
        .collect();

    let result = SampleFilterResult {
        n_samples_before: table.n_samples(),
        n_samples_after: filtered.n_samples(),
        removed_samples,
        n_features_before: table.n_features(),
        n_features_after: filtered.n_features(),
    };

    Ok((filtered, result))
}

//! Restricting sequence records to the features present in a table.

use crate::data::{FeatureTable, SequenceSet};
use crate::error::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keep the sequence records whose ID appears among the table's feature IDs.
///
/// Intersection semantics: sequences without a table feature are dropped, and
/// table features without a sequence are permitted. An empty table yields an
/// empty sequence set. Record order is preserved.
pub fn filter_seqs(seqs: &SequenceSet, table: &FeatureTable) -> Result<SequenceSet> {
    let keep: HashSet<&str> = table.feature_ids().iter().map(String::as_str).collect();
    let filtered = seqs.subset(&keep);
    debug!(
        "sequence filter: {} of {} records retained",
        filtered.len(),
        seqs.len()
    );
    Ok(filtered)
}

/// Result of sequence filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeqFilterResult {
    /// Number of records before filtering.
    pub n_before: usize,
    /// Number of records after filtering.
    pub n_after: usize,
    /// IDs of removed records.
    pub removed_ids: Vec<String>,
    /// Table features that had no corresponding sequence.
    pub features_without_seq: Vec<String>,
}

impl std::fmt::Display for SeqFilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sequence Filter Result")?;
        writeln!(f, "  Records before:  {}", self.n_before)?;
        writeln!(f, "  Records after:   {}", self.n_after)?;
        writeln!(f, "  Records removed: {}", self.removed_ids.len())?;
        if !self.removed_ids.is_empty() {
            writeln!(f, "  Removed: {:?}", self.removed_ids)?;
        }
        if !self.features_without_seq.is_empty() {
            writeln!(
                f,
                "  Table features without a sequence: {:?}",
                self.features_without_seq
            )?;
        }
        Ok(())
    }
}

/// Filter sequences, reporting what was removed on either side.
pub fn filter_seqs_with_stats(
    seqs: &SequenceSet,
    table: &FeatureTable,
) -> Result<(SequenceSet, SeqFilterResult)> {
    let filtered = filter_seqs(seqs, table)?;

    let kept: HashSet<&str> = filtered.ids().into_iter().collect();
    let removed_ids: Vec<String> = seqs
        .ids()
        .into_iter()
        .filter(|id| !kept.contains(id))
        .map(str::to_string)
        .collect();

    let features_without_seq: Vec<String> = table
        .feature_ids()
        .iter()
        .filter(|fid| !seqs.contains(fid))
        .cloned()
        .collect();

    let result = SeqFilterResult {
        n_before: seqs.len(),
        n_after: filtered.len(),
        removed_ids,
        features_without_seq,
    };

    Ok((filtered, result))
}

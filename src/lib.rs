//! Metadata-driven filtering of feature tables and representative sequences.
//!
//! Given an amplicon feature table, a sample metadata file, and a FASTA file
//! of representative sequences, this library restricts the table to the
//! samples described by the metadata and then restricts the sequences to the
//! features surviving in the filtered table.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (FeatureTable, Metadata, SequenceSet)
//! - **filter**: Sample-level table filtering and table-driven sequence filtering
//! - **pipeline**: Pipeline composition, YAML configs, and the combined
//!   table-then-sequences operation
//! - **summary**: Feature table summary statistics
//!
//! # Example
//!
//! ```no_run
//! use feature_table_filter::prelude::*;
//!
//! // Load data
//! let table = FeatureTable::from_tsv("table.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//! let seqs = SequenceSet::from_fasta("rep-seqs.fasta").unwrap();
//!
//! // Filter the table to the metadata's samples, then the sequences to the
//! // filtered table's features.
//! let (table, seqs) = filter_table_and_seqs(&metadata, &table, &seqs).unwrap();
//! ```

pub mod data;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod summary;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{FeatureTable, Metadata, SeqRecord, SequenceSet, Value, WhereClause};
    pub use crate::error::{FilterError, Result};
    pub use crate::filter::{
        // Sample filtering
        drop_empty_features, filter_samples, filter_samples_by_feature_count,
        filter_samples_by_frequency, filter_samples_by_metadata, filter_samples_where,
        filter_samples_with_stats, SampleFilter, SampleFilterResult,
        // Sequence filtering
        filter_seqs, filter_seqs_with_stats, SeqFilterResult,
    };
    pub use crate::pipeline::{
        filter_table_and_seqs, Pipeline, PipelineConfig, PipelineStep,
    };
    pub use crate::summary::{summarize_table, TableSummary};
}

//! Filtering primitives for feature tables and sequence records.

pub mod samples;
pub mod seqs;

pub use samples::{
    drop_empty_features, filter_samples, filter_samples_by_feature_count,
    filter_samples_by_frequency, filter_samples_by_metadata, filter_samples_where,
    filter_samples_with_stats, SampleFilter, SampleFilterResult,
};
pub use seqs::{filter_seqs, filter_seqs_with_stats, SeqFilterResult};

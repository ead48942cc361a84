//! Core data structures: feature table, sample metadata, sequence records.

mod feature_table;
mod metadata;
mod seqs;

pub use feature_table::FeatureTable;
pub use metadata::{Metadata, Value, WhereClause, WhereOp};
pub use seqs::{SeqRecord, SequenceSet};

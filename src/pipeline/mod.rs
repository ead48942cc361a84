//! Pipeline composition and execution for table and sequence filtering.

mod runner;

pub use runner::{
    compose_filters, filter_table_and_seqs, Pipeline, PipelineConfig, PipelineStep,
};

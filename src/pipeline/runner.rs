//! Composing sample and sequence filtering into a single run.

use crate::data::{FeatureTable, Metadata, SequenceSet, WhereClause};
use crate::error::{FilterError, Result};
use crate::filter::{
    drop_empty_features, filter_samples, filter_samples_by_feature_count,
    filter_samples_by_frequency, filter_samples_by_metadata, filter_samples_where, filter_seqs,
    SampleFilter,
};
use log::info;
use serde::{Deserialize, Serialize};

/// Run the table filter, then the sequence filter on its result.
///
/// The sequencing is fixed: the table is filtered first with the original
/// table and the metadata, and the sequence filter always receives the
/// filtered table, even when it has no samples left. The outputs of the two
/// operations are returned untouched.
pub fn compose_filters<F, G>(
    metadata: &Metadata,
    table: &FeatureTable,
    seqs: &SequenceSet,
    mut table_op: F,
    mut seq_op: G,
) -> Result<(FeatureTable, SequenceSet)>
where
    F: FnMut(&FeatureTable, &Metadata) -> Result<FeatureTable>,
    G: FnMut(&SequenceSet, &FeatureTable) -> Result<SequenceSet>,
{
    let filtered_table = table_op(table, metadata)?;
    let filtered_seqs = seq_op(seqs, &filtered_table)?;
    Ok((filtered_table, filtered_seqs))
}

/// Filter a table down to the samples in the metadata, then the sequences
/// down to the features surviving in the filtered table.
///
/// Uses the default sample criteria, so features emptied by the sample
/// selection are dropped before the sequence filter runs. Errors from either
/// step propagate unchanged.
pub fn filter_table_and_seqs(
    metadata: &Metadata,
    table: &FeatureTable,
    seqs: &SequenceSet,
) -> Result<(FeatureTable, SequenceSet)> {
    compose_filters(
        metadata,
        table,
        seqs,
        |t, m| filter_samples(t, Some(m), &SampleFilter::default()),
        |s, t| filter_seqs(s, t),
    )
}

/// A step in a filtering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Keep (or with `exclude_ids`, remove) samples named in the metadata.
    FilterSamplesByMetadata { exclude_ids: bool },
    /// Keep samples matching a metadata predicate.
    FilterSamplesWhere { clause: String },
    /// Keep samples within a total-frequency range.
    FilterSamplesByFrequency {
        min_frequency: f64,
        max_frequency: Option<f64>,
    },
    /// Keep samples within an observed-feature-count range.
    FilterSamplesByFeatureCount {
        min_features: usize,
        max_features: Option<usize>,
    },
    /// Drop features with no remaining non-zero values.
    DropEmptyFeatures,
    /// Restrict sequences to the current table's features.
    FilterSeqs,
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(FilterError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(FilterError::from)
    }
}

/// Builder for constructing and running filtering pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Keep samples named in the metadata.
    pub fn filter_samples_by_metadata(mut self) -> Self {
        self.steps.push(PipelineStep::FilterSamplesByMetadata {
            exclude_ids: false,
        });
        self
    }

    /// Remove samples named in the metadata.
    pub fn exclude_samples_by_metadata(mut self) -> Self {
        self.steps
            .push(PipelineStep::FilterSamplesByMetadata { exclude_ids: true });
        self
    }

    /// Keep samples matching a metadata predicate, e.g. `body_site=gut`.
    pub fn filter_samples_where(mut self, clause: &str) -> Self {
        self.steps.push(PipelineStep::FilterSamplesWhere {
            clause: clause.to_string(),
        });
        self
    }

    /// Keep samples within a total-frequency range.
    pub fn filter_samples_by_frequency(
        mut self,
        min_frequency: f64,
        max_frequency: Option<f64>,
    ) -> Self {
        self.steps.push(PipelineStep::FilterSamplesByFrequency {
            min_frequency,
            max_frequency,
        });
        self
    }

    /// Keep samples within an observed-feature-count range.
    pub fn filter_samples_by_feature_count(
        mut self,
        min_features: usize,
        max_features: Option<usize>,
    ) -> Self {
        self.steps.push(PipelineStep::FilterSamplesByFeatureCount {
            min_features,
            max_features,
        });
        self
    }

    /// Drop features left empty by earlier steps.
    pub fn drop_empty_features(mut self) -> Self {
        self.steps.push(PipelineStep::DropEmptyFeatures);
        self
    }

    /// Restrict sequences to the current table's features.
    pub fn filter_seqs(mut self) -> Self {
        self.steps.push(PipelineStep::FilterSeqs);
        self
    }

    /// Convert to a config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Run the pipeline, returning the filtered table and sequences.
    pub fn run(
        &self,
        table: &FeatureTable,
        metadata: &Metadata,
        seqs: &SequenceSet,
    ) -> Result<(FeatureTable, SequenceSet)> {
        info!("running pipeline '{}' ({} steps)", self.name, self.steps.len());
        let mut state = PipelineState {
            table: table.clone(),
            seqs: seqs.clone(),
        };

        for (i, step) in self.steps.iter().enumerate() {
            state = state.apply(step, metadata).map_err(|e| {
                FilterError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        Ok((state.table, state.seqs))
    }
}

/// Internal state during pipeline execution.
struct PipelineState {
    table: FeatureTable,
    seqs: SequenceSet,
}

impl PipelineState {
    fn apply(mut self, step: &PipelineStep, metadata: &Metadata) -> Result<Self> {
        match step {
            PipelineStep::FilterSamplesByMetadata { exclude_ids } => {
                self.table = filter_samples_by_metadata(&self.table, metadata, *exclude_ids)?;
            }
            PipelineStep::FilterSamplesWhere { clause } => {
                let clause = WhereClause::parse(clause)?;
                self.table = filter_samples_where(&self.table, metadata, &clause)?;
            }
            PipelineStep::FilterSamplesByFrequency {
                min_frequency,
                max_frequency,
            } => {
                self.table =
                    filter_samples_by_frequency(&self.table, *min_frequency, *max_frequency)?;
            }
            PipelineStep::FilterSamplesByFeatureCount {
                min_features,
                max_features,
            } => {
                self.table =
                    filter_samples_by_feature_count(&self.table, *min_features, *max_features)?;
            }
            PipelineStep::DropEmptyFeatures => {
                self.table = drop_empty_features(&self.table)?;
            }
            PipelineStep::FilterSeqs => {
                self.seqs = filter_seqs(&self.seqs, &self.table)?;
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SeqRecord;
    use sprs::TriMat;
    use std::cell::RefCell;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_table() -> FeatureTable {
        // 3 features × 4 samples
        let mut tri_mat = TriMat::new((3, 4));
        tri_mat.add_triplet(0, 0, 10.0);
        tri_mat.add_triplet(0, 1, 20.0);
        tri_mat.add_triplet(1, 1, 200.0);
        tri_mat.add_triplet(1, 2, 150.0);
        tri_mat.add_triplet(2, 3, 7.0);

        let feature_ids = vec!["asv_A".to_string(), "asv_B".to_string(), "asv_C".to_string()];
        let sample_ids: Vec<String> = (1..=4).map(|i| format!("S{}", i)).collect();
        FeatureTable::new(tri_mat.to_csr(), feature_ids, sample_ids).unwrap()
    }

    fn create_test_seqs() -> SequenceSet {
        SequenceSet::from_records(vec![
            SeqRecord::new("asv_A", None, b"ACGT"),
            SeqRecord::new("asv_B", None, b"TTGG"),
            SeqRecord::new("asv_C", None, b"GGCC"),
        ])
    }

    fn create_test_metadata(ids: &[&str]) -> Metadata {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tbody_site").unwrap();
        for id in ids {
            writeln!(file, "{}\tgut", id).unwrap();
        }
        file.flush().unwrap();
        Metadata::from_tsv(file.path()).unwrap()
    }

    #[test]
    fn test_compose_calls_in_order_with_filtered_table() {
        let table = create_test_table();
        let seqs = create_test_seqs();
        let metadata = create_test_metadata(&["S1", "S2"]);

        let calls: RefCell<Vec<String>> = RefCell::new(Vec::new());

        // Stub table op: records its arguments and returns a table with a
        // recognizably different sample set.
        let stub_table = table.subset_samples(&[1]).unwrap();
        let stub_table_ids = stub_table.sample_ids().to_vec();

        let stub_seqs = SequenceSet::from_records(vec![SeqRecord::new("stub", None, b"A")]);
        let stub_seq_ids = vec!["stub".to_string()];

        let (out_table, out_seqs) = compose_filters(
            &metadata,
            &table,
            &seqs,
            |t, m| {
                calls.borrow_mut().push(format!(
                    "table_op(samples={:?}, meta={:?})",
                    t.sample_ids(),
                    m.sample_ids()
                ));
                Ok(stub_table.clone())
            },
            |s, t| {
                calls.borrow_mut().push(format!(
                    "seq_op(seqs={:?}, samples={:?})",
                    s.ids(),
                    t.sample_ids()
                ));
                Ok(stub_seqs.clone())
            },
        )
        .unwrap();

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 2);
        // First call sees the original table and the metadata.
        assert!(calls[0].starts_with("table_op"));
        assert!(calls[0].contains("S1"));
        assert!(calls[0].contains("S4"));
        // Second call sees the *filtered* table, not the original.
        assert!(calls[1].starts_with("seq_op"));
        assert!(calls[1].contains(&format!("samples={:?}", stub_table_ids)));

        // Return values pass through untouched.
        assert_eq!(out_table.sample_ids(), stub_table_ids.as_slice());
        assert_eq!(
            out_seqs.ids(),
            stub_seq_ids.iter().map(String::as_str).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_compose_no_short_circuit_on_empty_table() {
        let table = create_test_table();
        let seqs = create_test_seqs();
        let metadata = create_test_metadata(&["S1"]);

        let seq_op_called = RefCell::new(false);
        let empty = table.subset_samples(&[]).unwrap();

        let (out_table, out_seqs) = compose_filters(
            &metadata,
            &table,
            &seqs,
            |_, _| Ok(empty.clone()),
            |s, t| {
                *seq_op_called.borrow_mut() = true;
                assert_eq!(t.n_samples(), 0);
                filter_seqs(s, t)
            },
        )
        .unwrap();

        assert!(*seq_op_called.borrow());
        assert_eq!(out_table.n_samples(), 0);
        // The empty table still lists its features, so all sequences survive.
        assert_eq!(out_seqs.len(), 3);
    }

    #[test]
    fn test_compose_propagates_table_op_error() {
        let table = create_test_table();
        let seqs = create_test_seqs();
        let metadata = create_test_metadata(&["S1"]);

        let result = compose_filters(
            &metadata,
            &table,
            &seqs,
            |_, _| Err(FilterError::EmptyData("boom".to_string())),
            |s, t| filter_seqs(s, t),
        );
        assert!(matches!(result, Err(FilterError::EmptyData(_))));
    }

    #[test]
    fn test_filter_table_and_seqs() {
        let table = create_test_table();
        let seqs = create_test_seqs();
        // S1 and S2 retained: asv_C (only in S4) becomes empty and is dropped,
        // so its sequence goes too.
        let metadata = create_test_metadata(&["S1", "S2"]);

        let (filtered_table, filtered_seqs) =
            filter_table_and_seqs(&metadata, &table, &seqs).unwrap();

        assert_eq!(filtered_table.sample_ids(), &["S1", "S2"]);
        assert_eq!(filtered_table.feature_ids(), &["asv_A", "asv_B"]);
        assert_eq!(filtered_seqs.ids(), vec!["asv_A", "asv_B"]);
    }

    #[test]
    fn test_filter_table_and_seqs_empty_metadata_overlap() {
        let table = create_test_table();
        let seqs = create_test_seqs();
        let metadata = create_test_metadata(&["X1", "X2"]);

        let (filtered_table, filtered_seqs) =
            filter_table_and_seqs(&metadata, &table, &seqs).unwrap();

        assert_eq!(filtered_table.n_samples(), 0);
        assert_eq!(filtered_table.n_features(), 0);
        assert!(filtered_seqs.is_empty());
    }

    #[test]
    fn test_pipeline_run() {
        let table = create_test_table();
        let seqs = create_test_seqs();
        let metadata = create_test_metadata(&["S1", "S2", "S3"]);

        let (filtered_table, filtered_seqs) = Pipeline::new()
            .name("metadata-filter")
            .filter_samples_by_metadata()
            .filter_samples_by_frequency(15.0, None)
            .drop_empty_features()
            .filter_seqs()
            .run(&table, &metadata, &seqs)
            .unwrap();

        // Frequencies within metadata subset: S1=10, S2=220, S3=150.
        assert_eq!(filtered_table.sample_ids(), &["S2", "S3"]);
        assert_eq!(filtered_table.feature_ids(), &["asv_A", "asv_B"]);
        assert_eq!(filtered_seqs.ids(), vec!["asv_A", "asv_B"]);
    }

    #[test]
    fn test_pipeline_step_error_has_context() {
        let table = create_test_table();
        let seqs = create_test_seqs();
        let metadata = create_test_metadata(&["S1"]);

        let err = Pipeline::new()
            .filter_samples_where("not a clause")
            .run(&table, &metadata, &seqs)
            .unwrap_err();

        match err {
            FilterError::Pipeline(msg) => assert!(msg.contains("Step 1")),
            other => panic!("expected pipeline error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let pipeline = Pipeline::new()
            .name("roundtrip")
            .filter_samples_by_metadata()
            .filter_samples_where("body_site=gut")
            .filter_seqs();

        let config = pipeline.to_config(Some("metadata-driven filtering"));
        let yaml = config.to_yaml().unwrap();
        let reloaded = PipelineConfig::from_yaml(&yaml).unwrap();

        assert_eq!(reloaded.name, "roundtrip");
        assert_eq!(reloaded.steps.len(), 3);
        assert_eq!(
            reloaded.description.as_deref(),
            Some("metadata-driven filtering")
        );
    }
}

//! Representative sequence records associated with feature table entries.

use crate::error::{FilterError, Result};
use bio::io::fasta;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// A single sequence record. Format-agnostic: the header is split into an
/// identifier and an optional free-text description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

impl SeqRecord {
    pub fn new(id: &str, desc: Option<&str>, seq: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            desc: desc.map(str::to_string),
            seq: seq.to_vec(),
        }
    }
}

/// An ordered collection of sequence records, keyed by record ID.
#[derive(Debug, Clone, Default)]
pub struct SequenceSet {
    records: Vec<SeqRecord>,
}

impl SequenceSet {
    /// Create an empty sequence set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of records.
    pub fn from_records(records: Vec<SeqRecord>) -> Self {
        Self { records }
    }

    /// Load sequences from a FASTA file.
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = fasta::Reader::new(file);

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(SeqRecord::new(record.id(), record.desc(), record.seq()));
        }

        if records.is_empty() {
            return Err(FilterError::EmptyData(
                "No records in FASTA file".to_string(),
            ));
        }
        Ok(Self { records })
    }

    /// Write sequences to a FASTA file.
    pub fn to_fasta<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = fasta::Writer::new(BufWriter::new(file));
        for record in &self.records {
            writer.write(&record.id, record.desc.as_deref(), &record.seq)?;
        }
        Ok(())
    }

    /// Records in order.
    pub fn records(&self) -> &[SeqRecord] {
        &self.records
    }

    /// Record IDs in order.
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by ID.
    pub fn get(&self, id: &str) -> Option<&SeqRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Check if a record with the given ID exists.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Subset to records whose ID is in `keep`, preserving record order.
    pub fn subset(&self, keep: &HashSet<&str>) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| keep.contains(r.id.as_str()))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_seqs() -> SequenceSet {
        SequenceSet::from_records(vec![
            SeqRecord::new("asv_A", None, b"ACGTACGT"),
            SeqRecord::new("asv_B", Some("rep seq"), b"TTGGCCAA"),
            SeqRecord::new("asv_C", None, b"GGGGCCCC"),
        ])
    }

    #[test]
    fn test_basic_accessors() {
        let seqs = create_test_seqs();
        assert_eq!(seqs.len(), 3);
        assert!(!seqs.is_empty());
        assert_eq!(seqs.ids(), vec!["asv_A", "asv_B", "asv_C"]);
        assert!(seqs.contains("asv_B"));
        assert!(!seqs.contains("asv_Z"));
        assert_eq!(seqs.get("asv_A").unwrap().seq, b"ACGTACGT");
    }

    #[test]
    fn test_subset_preserves_order() {
        let seqs = create_test_seqs();
        let keep: HashSet<&str> = ["asv_C", "asv_A"].into_iter().collect();
        let subset = seqs.subset(&keep);
        assert_eq!(subset.ids(), vec!["asv_A", "asv_C"]);
    }

    #[test]
    fn test_subset_empty() {
        let seqs = create_test_seqs();
        let subset = seqs.subset(&HashSet::new());
        assert!(subset.is_empty());
    }

    #[test]
    fn test_fasta_roundtrip() {
        let seqs = create_test_seqs();

        let temp = NamedTempFile::new().unwrap();
        seqs.to_fasta(temp.path()).unwrap();

        let loaded = SequenceSet::from_fasta(temp.path()).unwrap();
        assert_eq!(loaded.records(), seqs.records());
    }

    #[test]
    fn test_from_fasta_parses_description() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">asv_1 some description").unwrap();
        writeln!(file, "ACGT").unwrap();
        file.flush().unwrap();

        let seqs = SequenceSet::from_fasta(file.path()).unwrap();
        let record = seqs.get("asv_1").unwrap();
        assert_eq!(record.desc.as_deref(), Some("some description"));
        assert_eq!(record.seq, b"ACGT");
    }

    #[test]
    fn test_empty_fasta_is_error() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            SequenceSet::from_fasta(file.path()),
            Err(FilterError::EmptyData(_))
        ));
    }
}

//! Sample metadata handling for metadata-driven filtering.

use crate::error::{FilterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A metadata value that can be categorical, continuous, or missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Categorical value with string levels.
    Categorical(String),
    /// Continuous numeric value.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Value {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Value::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Value::Continuous(v) => Some(*v),
            _ => None,
        }
    }
}

/// Comparison operator in a where clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhereOp {
    Eq,
    Ne,
}

/// A simple equality predicate over a metadata column.
///
/// Parsed from `column=value` or `column!=value`. Missing values match
/// neither operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub column: String,
    pub op: WhereOp,
    pub value: String,
}

impl WhereClause {
    /// Parse a clause of the form `column=value` or `column!=value`.
    pub fn parse(clause: &str) -> Result<Self> {
        let (column, op, value) = if let Some((col, val)) = clause.split_once("!=") {
            (col, WhereOp::Ne, val)
        } else if let Some((col, val)) = clause.split_once('=') {
            (col, WhereOp::Eq, val)
        } else {
            return Err(FilterError::InvalidWhereClause {
                clause: clause.to_string(),
                reason: "expected 'column=value' or 'column!=value'".to_string(),
            });
        };

        let column = column.trim();
        let value = value.trim();
        if column.is_empty() || value.is_empty() {
            return Err(FilterError::InvalidWhereClause {
                clause: clause.to_string(),
                reason: "column and value must be non-empty".to_string(),
            });
        }

        Ok(Self {
            column: column.to_string(),
            op,
            value: value.to_string(),
        })
    }

    fn matches(&self, value: &Value) -> bool {
        let equal = match value {
            Value::Categorical(s) => s == &self.value,
            Value::Continuous(v) => self
                .value
                .parse::<f64>()
                .map(|clause_v| (clause_v - v).abs() < f64::EPSILON)
                .unwrap_or(false),
            Value::Missing => return false,
        };
        match self.op {
            WhereOp::Eq => equal,
            WhereOp::Ne => !equal,
        }
    }
}

/// Sample metadata: per-sample values keyed by sample ID.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Value.
    data: HashMap<String, HashMap<String, Value>>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by values
    ///
    /// Rows whose first field starts with `#` are skipped, so comment and
    /// type-directive lines emitted by common metadata exporters are
    /// tolerated. A column is inferred as continuous when all its non-missing
    /// values parse as numbers, otherwise categorical. Empty, `NA` and `na`
    /// fields are missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .flexible(true)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(FilterError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header.iter().skip(1).map(str::to_string).collect();

        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut fields = record.iter();
            let sample_id = match fields.next() {
                Some(id) if !id.trim().is_empty() => id.to_string(),
                _ => continue,
            };
            let values: Vec<String> = fields.map(str::to_string).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(FilterError::EmptyData("No samples in metadata".to_string()));
        }

        // Infer which columns are continuous.
        let mut continuous: HashSet<usize> = HashSet::new();
        for (col_idx, _) in column_names.iter().enumerate() {
            let all_numeric = raw_data.iter().all(|(_, values)| {
                match values.get(col_idx) {
                    None => true,
                    Some(v) => {
                        let v = v.trim();
                        v.is_empty() || v == "NA" || v == "na" || v.parse::<f64>().is_ok()
                    }
                }
            });
            if all_numeric {
                continuous.insert(col_idx);
            }
        }

        let mut sample_ids = Vec::new();
        let mut data = HashMap::new();

        for (sample_id, values) in raw_data {
            sample_ids.push(sample_id.clone());
            let mut sample_data = HashMap::new();

            for (col_idx, col_name) in column_names.iter().enumerate() {
                let raw = values.get(col_idx).map(|v| v.trim()).unwrap_or("");
                let value = if raw.is_empty() || raw == "NA" || raw == "na" {
                    Value::Missing
                } else if continuous.contains(&col_idx) {
                    raw.parse::<f64>()
                        .map(Value::Continuous)
                        .unwrap_or(Value::Missing)
                } else {
                    Value::Categorical(raw.to_string())
                };
                sample_data.insert(col_name.clone(), value);
            }
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
        })
    }

    /// Sample IDs in file order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// The set of sample IDs, for membership tests.
    pub fn id_set(&self) -> HashSet<&str> {
        self.sample_ids.iter().map(String::as_str).collect()
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of columns (variables).
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// Get a value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Value> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// IDs of samples whose value satisfies the clause, in file order.
    pub fn ids_where(&self, clause: &WhereClause) -> Result<Vec<String>> {
        if !self.has_column(&clause.column) {
            return Err(FilterError::MissingColumn(clause.column.clone()));
        }
        Ok(self
            .sample_ids
            .iter()
            .filter(|sid| {
                self.data
                    .get(sid.as_str())
                    .and_then(|m| m.get(&clause.column))
                    .map(|v| clause.matches(v))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    /// Subset metadata to only include specified samples.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let mut new_data = HashMap::new();
        let mut new_sample_ids = Vec::new();

        for sid in sample_ids {
            if let Some(sample_data) = self.data.get(sid) {
                new_data.insert(sid.clone(), sample_data.clone());
                new_sample_ids.push(sid.clone());
            } else {
                return Err(FilterError::SampleMismatch(format!(
                    "Sample '{}' not found in metadata",
                    sid
                )));
            }
        }

        Ok(Self {
            sample_ids: new_sample_ids,
            column_names: self.column_names.clone(),
            data: new_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tbody_site\tdays").unwrap();
        writeln!(file, "#q2:types\tcategorical\tnumeric").unwrap();
        writeln!(file, "S1\tgut\t7").unwrap();
        writeln!(file, "S2\ttongue\t14").unwrap();
        writeln!(file, "S3\tgut\t28").unwrap();
        writeln!(file, "S4\tpalm\tNA").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_metadata() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.n_samples(), 4);
        assert_eq!(meta.n_columns(), 2);
        assert_eq!(meta.sample_ids(), &["S1", "S2", "S3", "S4"]);
        assert_eq!(meta.column_names(), &["body_site", "days"]);
    }

    #[test]
    fn test_directive_row_skipped() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();
        assert!(!meta.has_sample("#q2:types"));
    }

    #[test]
    fn test_type_inference() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.get("S1", "body_site").unwrap().as_categorical(), Some("gut"));
        assert_eq!(meta.get("S2", "days").unwrap().as_continuous(), Some(14.0));
        assert!(meta.get("S4", "days").unwrap().is_missing());
    }

    #[test]
    fn test_id_set() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let ids = meta.id_set();
        assert!(ids.contains("S1"));
        assert!(!ids.contains("S9"));
    }

    #[test]
    fn test_where_clause_parse() {
        let eq = WhereClause::parse("body_site=gut").unwrap();
        assert_eq!(eq.column, "body_site");
        assert_eq!(eq.op, WhereOp::Eq);
        assert_eq!(eq.value, "gut");

        let ne = WhereClause::parse("body_site != gut").unwrap();
        assert_eq!(ne.op, WhereOp::Ne);
        assert_eq!(ne.value, "gut");

        assert!(WhereClause::parse("body_site").is_err());
        assert!(WhereClause::parse("=gut").is_err());
    }

    #[test]
    fn test_ids_where() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let clause = WhereClause::parse("body_site=gut").unwrap();
        assert_eq!(meta.ids_where(&clause).unwrap(), vec!["S1", "S3"]);

        let clause = WhereClause::parse("days=14").unwrap();
        assert_eq!(meta.ids_where(&clause).unwrap(), vec!["S2"]);

        // Missing values match neither operator.
        let clause = WhereClause::parse("days!=14").unwrap();
        assert_eq!(meta.ids_where(&clause).unwrap(), vec!["S1", "S3"]);

        let clause = WhereClause::parse("no_such_column=x").unwrap();
        assert!(matches!(
            meta.ids_where(&clause),
            Err(FilterError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_subset_samples() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let subset = meta
            .subset_samples(&["S1".to_string(), "S3".to_string()])
            .unwrap();
        assert_eq!(subset.n_samples(), 2);
        assert_eq!(subset.sample_ids(), &["S1", "S3"]);

        assert!(meta.subset_samples(&["S9".to_string()]).is_err());
    }
}

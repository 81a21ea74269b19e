use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use tracing::debug;

use crate::domain::EnrichmentRow;
use crate::error::KiraError;

pub const FRAGMENT_SUFFIX: &str = ".txt";

/// Candidate terms merged from every result fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<EnrichmentRow>,
}

impl ResultTable {
    pub fn new(rows: Vec<EnrichmentRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichmentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct ResultAggregator;

impl ResultAggregator {
    /// Reads every `*.txt` regular file in `scratch_dir` in file-name order and
    /// concatenates their rows. No fragments yields an empty table.
    pub fn aggregate(scratch_dir: &Utf8Path) -> Result<ResultTable, KiraError> {
        let mut rows = Vec::new();
        for path in Self::fragment_paths(scratch_dir)? {
            let fragment = Self::read_fragment(&path)?;
            debug!(path = %path.display(), rows = fragment.len(), "read result fragment");
            rows.extend(fragment);
        }
        Ok(ResultTable::new(rows))
    }

    fn fragment_paths(scratch_dir: &Utf8Path) -> Result<Vec<PathBuf>, KiraError> {
        let entries = fs::read_dir(scratch_dir.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("read {scratch_dir}: {err}")))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| KiraError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_fragment = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(FRAGMENT_SUFFIX));
            if is_fragment {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn read_fragment(path: &Path) -> Result<Vec<EnrichmentRow>, KiraError> {
        let parse_error = |message: String| KiraError::FragmentParse {
            path: path.to_path_buf(),
            message,
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .map_err(|err| parse_error(err.to_string()))?;
        reader
            .deserialize::<EnrichmentRow>()
            .map(|row| row.map_err(|err| parse_error(err.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Gene_set\tTerm\tOverlap\tP-value\tAdjusted P-value\tGenes\n";

    #[test]
    fn missing_scratch_dir_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let missing = Utf8Path::from_path(temp.path()).unwrap().join("nope");
        assert!(ResultAggregator::aggregate(&missing).is_err());
    }

    #[test]
    fn header_only_fragment_has_no_rows() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), HEADER).unwrap();
        let table = ResultAggregator::aggregate(Utf8Path::from_path(temp.path()).unwrap()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn malformed_p_value_reports_path() {
        let temp = tempfile::tempdir().unwrap();
        let body = format!("{HEADER}set1\tterm1\t2/25\tnot-a-number\t0.05\tB;C\n");
        fs::write(temp.path().join("bad.txt"), body).unwrap();
        let err =
            ResultAggregator::aggregate(Utf8Path::from_path(temp.path()).unwrap()).unwrap_err();
        match err {
            KiraError::FragmentParse { path, .. } => assert!(path.ends_with("bad.txt")),
            other => panic!("unexpected error: {other}"),
        }
    }
}

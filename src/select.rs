use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::aggregate::ResultTable;
use crate::domain::{EnrichmentRow, Overlap, SelectedTerm};
use crate::error::KiraError;

/// Why no term was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoTermReason {
    EmptyTable,
    AboveCutoff,
}

impl fmt::Display for NoTermReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoTermReason::EmptyTable => write!(f, "empty data frame"),
            NoTermReason::AboveCutoff => write!(f, "empty after p-value filter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Found(SelectedTerm),
    NotFound(NoTermReason),
}

pub struct TermSelector;

impl TermSelector {
    /// Picks the most significant term with adjusted p-value `<= cutoff`.
    ///
    /// Ties on adjusted p-value go to the lower raw p-value; remaining ties keep
    /// table order.
    pub fn select(
        table: &ResultTable,
        cutoff: f64,
        gene_set_size: usize,
    ) -> Result<Selection, KiraError> {
        if table.is_empty() {
            return Ok(Selection::NotFound(NoTermReason::EmptyTable));
        }

        let mut passing = table
            .rows()
            .iter()
            .filter(|row| row.adjusted_p_value <= cutoff)
            .collect::<Vec<_>>();
        debug!(
            total = table.len(),
            passing = passing.len(),
            cutoff,
            "filtered by adjusted p-value"
        );
        if passing.is_empty() {
            return Ok(Selection::NotFound(NoTermReason::AboveCutoff));
        }

        passing.sort_by(|a, b| rank(a, b));
        let winner = passing[0];

        let overlap: Overlap = winner.overlap.parse()?;
        let intersections = winner.intersections();
        let jaccard = round3(intersections.len() as f64 / gene_set_size.max(1) as f64);

        Ok(Selection::Found(SelectedTerm {
            name: winner.term_name.clone(),
            source: winner.gene_set_name.clone(),
            source_term_id: String::new(),
            p_value: winner.adjusted_p_value,
            description: String::new(),
            term_size: overlap.term_size,
            intersections,
            jaccard,
        }))
    }
}

fn rank(a: &EnrichmentRow, b: &EnrichmentRow) -> Ordering {
    a.adjusted_p_value
        .total_cmp(&b.adjusted_p_value)
        .then_with(|| a.p_value.total_cmp(&b.p_value))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

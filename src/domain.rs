use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

static LIBRARY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("library name pattern"));

/// Upper-cased query genes in the order they were given.
///
/// Tokens are neither deduplicated nor filtered; only a list that reduces to a
/// single blank token counts as "no genes".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSet(Vec<String>);

impl GeneSet {
    /// Normalizes raw comma-delimited text. Returns `None` when no genes remain.
    pub fn parse(raw: &str) -> Option<Self> {
        let genes = raw
            .trim_matches(',')
            .trim_matches(['\r', '\n'])
            .to_uppercase()
            .split(',')
            .map(str::to_string)
            .collect::<Vec<_>>();
        if genes.len() == 1 && genes[0].trim().is_empty() {
            return None;
        }
        Some(Self(genes))
    }

    pub fn genes(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A named gene-set collection known to Enrichr, e.g. `KEGG_2019_Human`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeneSetLibrary(String);

impl GeneSetLibrary {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a comma-delimited list, skipping empty entries.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, KiraError> {
        value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| name.parse::<Self>())
            .collect()
    }
}

impl fmt::Display for GeneSetLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GeneSetLibrary {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !LIBRARY_NAME.is_match(trimmed) {
            return Err(KiraError::InvalidLibrary(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for GeneSetLibrary {
    type Error = KiraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GeneSetLibrary> for String {
    fn from(value: GeneSetLibrary) -> Self {
        value.0
    }
}

pub fn default_libraries() -> Vec<GeneSetLibrary> {
    [
        "GO_Biological_Process_2018",
        "GO_Cellular_Component_2018",
        "GO_Molecular_Function_2018",
        "KEGG_2019_Human",
        "Reactome_2016",
        "WikiPathways_2019_Human",
        "Human_Phenotype_Ontology",
        "Jensen_DISEASES",
    ]
    .into_iter()
    .map(|name| GeneSetLibrary(name.to_string()))
    .collect()
}

/// Enrichr "k/n" overlap: `k` query genes hit a term whose reference set has `n` genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub matched: u32,
    pub term_size: u32,
}

impl FromStr for Overlap {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (matched, term_size) = value
            .trim()
            .split_once('/')
            .ok_or_else(|| KiraError::InvalidOverlap(value.to_string()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| KiraError::InvalidOverlap(value.to_string()))
        };
        Ok(Self {
            matched: parse(matched)?,
            term_size: parse(term_size)?,
        })
    }
}

/// One candidate term as written by Enrichr into a result fragment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrichmentRow {
    #[serde(rename = "Gene_set")]
    pub gene_set_name: String,
    #[serde(rename = "Term")]
    pub term_name: String,
    #[serde(rename = "Overlap")]
    pub overlap: String,
    #[serde(rename = "P-value")]
    pub p_value: f64,
    #[serde(rename = "Adjusted P-value")]
    pub adjusted_p_value: f64,
    #[serde(rename = "Genes", default)]
    pub matched_genes: String,
}

impl EnrichmentRow {
    pub fn intersections(&self) -> Vec<String> {
        self.matched_genes
            .split(';')
            .map(str::to_string)
            .collect()
    }
}

/// The reported best term.
///
/// `jaccard` is matched genes over query size, not over the union. The name is
/// kept for output compatibility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedTerm {
    pub name: String,
    pub source: String,
    #[serde(rename = "sourceTermId")]
    pub source_term_id: String,
    pub p_value: f64,
    pub description: String,
    pub term_size: u32,
    pub intersections: Vec<String>,
    pub jaccard: f64,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_gene_set_uppercases_and_keeps_order() {
        let genes = GeneSet::parse("tp53,brca1,Egfr\n").unwrap();
        assert_eq!(genes.genes(), ["TP53", "BRCA1", "EGFR"]);
    }

    #[test]
    fn parse_gene_set_crlf_line_ending() {
        let genes = GeneSet::parse("a,b,c\r\n").unwrap();
        assert_eq!(genes.genes(), ["A", "B", "C"]);
    }

    #[test]
    fn parse_gene_set_keeps_duplicates() {
        let genes = GeneSet::parse("a,A,b").unwrap();
        assert_eq!(genes.genes(), ["A", "A", "B"]);
    }

    #[test]
    fn parse_gene_set_strips_outer_commas() {
        let genes = GeneSet::parse(",a,b,").unwrap();
        assert_eq!(genes.genes(), ["A", "B"]);
    }

    #[test]
    fn parse_gene_set_blank_is_none() {
        assert_eq!(GeneSet::parse(""), None);
        assert_eq!(GeneSet::parse(",,"), None);
        assert_eq!(GeneSet::parse("  \n"), None);
    }

    #[test]
    fn parse_library_invalid() {
        let err = "KEGG 2019/../x".parse::<GeneSetLibrary>().unwrap_err();
        assert_matches!(err, KiraError::InvalidLibrary(_));
    }

    #[test]
    fn parse_library_list() {
        let libraries = GeneSetLibrary::parse_list("KEGG_2019_Human, Reactome_2016,").unwrap();
        assert_eq!(libraries.len(), 2);
        assert_eq!(libraries[1].as_str(), "Reactome_2016");
    }

    #[test]
    fn parse_overlap() {
        let overlap: Overlap = "7/9".parse().unwrap();
        assert_eq!(overlap.matched, 7);
        assert_eq!(overlap.term_size, 9);
        assert_matches!("79".parse::<Overlap>(), Err(KiraError::InvalidOverlap(_)));
        assert_matches!("7/x".parse::<Overlap>(), Err(KiraError::InvalidOverlap(_)));
    }
}

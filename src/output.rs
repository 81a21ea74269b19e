use std::io::{self, Write};

use serde::Serialize;

use crate::app::PipelineOutcome;

pub struct JsonOutput;

impl JsonOutput {
    /// Writes the selected term to `out`, or a message to `err` when there is none.
    /// Nothing reaches `out` in the latter case.
    pub fn print_outcome(
        outcome: &PipelineOutcome,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<()> {
        match outcome {
            PipelineOutcome::Term(term) => Self::write_json(out, term)?,
            PipelineOutcome::NoGenes => writeln!(err, "No genes found in input")?,
            PipelineOutcome::NoTerms(_) => writeln!(err, "No terms found")?,
        }
        out.flush()
    }

    fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> io::Result<()> {
        let json = serde_json::to_string(value).map_err(io::Error::other)?;
        out.write_all(json.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::NoTermsCause;
    use crate::domain::SelectedTerm;
    use crate::select::NoTermReason;

    fn render(outcome: &PipelineOutcome) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        JsonOutput::print_outcome(outcome, &mut out, &mut err).unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn term_is_single_json_line_in_field_order() {
        let term = SelectedTerm {
            name: "term2".to_string(),
            source: "set2".to_string(),
            source_term_id: String::new(),
            p_value: 0.03,
            description: String::new(),
            term_size: 9,
            intersections: vec!["A".to_string(), "C".to_string()],
            jaccard: 0.667,
        };
        let (out, err) = render(&PipelineOutcome::Term(term));
        assert_eq!(
            out,
            "{\"name\":\"term2\",\"source\":\"set2\",\"sourceTermId\":\"\",\"p_value\":0.03,\
             \"description\":\"\",\"term_size\":9,\"intersections\":[\"A\",\"C\"],\"jaccard\":0.667}\n"
        );
        assert!(err.is_empty());
    }

    #[test]
    fn no_terms_writes_only_to_error_channel() {
        let outcome =
            PipelineOutcome::NoTerms(NoTermsCause::Selection(NoTermReason::AboveCutoff));
        let (out, err) = render(&outcome);
        assert!(out.is_empty());
        assert_eq!(err, "No terms found\n");
    }

    #[test]
    fn no_genes_message() {
        let (out, err) = render(&PipelineOutcome::NoGenes);
        assert!(out.is_empty());
        assert_eq!(err, "No genes found in input\n");
    }
}

use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::aggregate::ResultAggregator;
use crate::config::ResolvedConfig;
use crate::domain::{GeneSet, SelectedTerm};
use crate::enrichr::{EnrichmentRequest, EnrichrClient};
use crate::error::KiraError;
use crate::fs_util::{ScratchDir, read_input_file};
use crate::invoker::{EnrichmentInvoker, InvokeOutcome, RetryPolicy};
use crate::select::{NoTermReason, Selection, TermSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoTermsCause {
    RetriesExceeded { attempts: u32 },
    Selection(NoTermReason),
}

/// Result of one run. Only [`KiraError`] counts as a failure; every variant here
/// is a successful run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Term(SelectedTerm),
    NoGenes,
    NoTerms(NoTermsCause),
}

pub struct App<E: EnrichrClient> {
    client: E,
    config: ResolvedConfig,
}

impl<E: EnrichrClient> App<E> {
    pub fn new(client: E, config: ResolvedConfig) -> Self {
        Self { client, config }
    }

    fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::immediate(self.config.retries);
        match self.config.deadline {
            Some(deadline) => policy.with_deadline(deadline),
            None => policy,
        }
    }

    /// Reads the gene list at `input` and selects the best enriched term.
    ///
    /// Progress from the enrichment service goes to `diagnostics`.
    pub fn run(
        &self,
        input: &Path,
        diagnostics: &mut dyn Write,
    ) -> Result<PipelineOutcome, KiraError> {
        let raw = read_input_file(input)?;
        let Some(genes) = GeneSet::parse(&raw) else {
            warn!(input = %input.display(), "no genes found in input");
            return Ok(PipelineOutcome::NoGenes);
        };
        info!(genes = genes.len(), "parsed gene list");

        let scratch = match &self.config.tmpdir {
            Some(path) => ScratchDir::provided(path.clone())?,
            None => ScratchDir::ephemeral()?,
        };

        let request = EnrichmentRequest {
            genes: &genes,
            libraries: &self.config.libraries,
            cutoff: self.config.cutoff,
            scratch_dir: scratch.path(),
        };
        let invoker = EnrichmentInvoker::new(&self.client, self.retry_policy());
        if let InvokeOutcome::Exhausted { attempts } = invoker.invoke(&request, diagnostics) {
            warn!(attempts, "retries exceeded");
            return Ok(PipelineOutcome::NoTerms(NoTermsCause::RetriesExceeded {
                attempts,
            }));
        }

        let table = ResultAggregator::aggregate(scratch.path())?;
        info!(rows = table.len(), scratch = %scratch.path(), "aggregated result fragments");

        match TermSelector::select(&table, self.config.cutoff, genes.len())? {
            Selection::Found(term) => {
                info!(term = %term.name, source = %term.source, p_value = term.p_value, "selected term");
                Ok(PipelineOutcome::Term(term))
            }
            Selection::NotFound(reason) => {
                info!(%reason, "no term selected");
                Ok(PipelineOutcome::NoTerms(NoTermsCause::Selection(reason)))
            }
        }
    }
}

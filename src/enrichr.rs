use std::fmt;
use std::io::Write;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::{GeneSet, GeneSetLibrary};
use crate::error::KiraError;
use crate::fs_util::write_atomic;

pub const DEFAULT_ENRICHR_URL: &str = "https://maayanlab.cloud/Enrichr";
pub const DEFAULT_DESCRIPTION: &str = "enrichr";

/// Everything the enrichment service needs for one call.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentRequest<'a> {
    pub genes: &'a GeneSet,
    pub libraries: &'a [GeneSetLibrary],
    pub cutoff: f64,
    pub scratch_dir: &'a Utf8Path,
}

/// The enrichment computation.
///
/// Implementations deposit one tab-delimited table per library into
/// `request.scratch_dir` and write any progress chatter to `diagnostics`.
pub trait EnrichrClient {
    fn enrich(
        &self,
        request: &EnrichmentRequest<'_>,
        diagnostics: &mut dyn Write,
    ) -> Result<(), KiraError>;
}

pub fn fragment_file_name(library: &GeneSetLibrary) -> String {
    format!("{library}.{DEFAULT_DESCRIPTION}.enrichr.reports.txt")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddListResponse {
    user_list_id: u64,
}

#[derive(Clone)]
pub struct EnrichrHttpClient {
    client: Client,
    base_url: String,
}

impl EnrichrHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-genes-to-term/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::EnrichrHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| KiraError::EnrichrHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn handle_status(response: Response) -> Result<Response, KiraError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Enrichr request failed".to_string());
        Err(KiraError::EnrichrStatus { status, message })
    }

    fn add_list(&self, genes: &GeneSet) -> Result<u64, KiraError> {
        let form = Form::new()
            .text("list", genes.genes().join("\n"))
            .text("description", DEFAULT_DESCRIPTION);
        let response = self
            .client
            .post(format!("{}/addList", self.base_url))
            .multipart(form)
            .send()
            .map_err(|err| KiraError::EnrichrHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body: AddListResponse = response
            .json()
            .map_err(|err| KiraError::EnrichrHttp(err.to_string()))?;
        Ok(body.user_list_id)
    }

    fn export(&self, user_list_id: u64, library: &GeneSetLibrary) -> Result<String, KiraError> {
        let response = self
            .client
            .get(format!("{}/export", self.base_url))
            .query(&[
                ("userListId", user_list_id.to_string()),
                ("filename", DEFAULT_DESCRIPTION.to_string()),
                ("backgroundType", library.as_str().to_string()),
            ])
            .send()
            .map_err(|err| KiraError::EnrichrHttp(err.to_string()))?;
        Self::handle_status(response)?
            .text()
            .map_err(|err| KiraError::EnrichrHttp(err.to_string()))
    }
}

impl EnrichrClient for EnrichrHttpClient {
    fn enrich(
        &self,
        request: &EnrichmentRequest<'_>,
        diagnostics: &mut dyn Write,
    ) -> Result<(), KiraError> {
        diagnostic(
            diagnostics,
            format_args!("Connecting to Enrichr server with {} genes", request.genes.len()),
        );
        let user_list_id = self.add_list(request.genes)?;
        for library in request.libraries {
            diagnostic(diagnostics, format_args!("Enrichr: querying {library}"));
            let export = self.export(user_list_id, library)?;
            let table = tag_with_library(&export, library)?;
            write_atomic(request.scratch_dir, &fragment_file_name(library), &table)?;
        }
        diagnostic(diagnostics, format_args!("Done."));
        Ok(())
    }
}

/// Writes one line to the diagnostics channel. Write failures are ignored.
pub fn diagnostic(diagnostics: &mut dyn Write, line: fmt::Arguments<'_>) {
    let _ = writeln!(diagnostics, "{line}");
}

/// Prepends a `Gene_set` column naming `library` to an Enrichr export table.
pub fn tag_with_library(export: &str, library: &GeneSetLibrary) -> Result<Vec<u8>, KiraError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(export.as_bytes());
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(Vec::new());

    let headers = reader
        .headers()
        .map_err(|err| KiraError::EnrichrHttp(format!("malformed export table: {err}")))?
        .clone();
    if headers.iter().all(|field| field.trim().is_empty()) {
        return Ok(Vec::new());
    }
    writer
        .write_record(std::iter::once("Gene_set").chain(headers.iter()))
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    for record in reader.records() {
        let record = record
            .map_err(|err| KiraError::EnrichrHttp(format!("malformed export table: {err}")))?;
        writer
            .write_record(std::iter::once(library.as_str()).chain(record.iter()))
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| KiraError::Filesystem(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_with_library_prepends_column() {
        let library: GeneSetLibrary = "KEGG_2019_Human".parse().unwrap();
        let export = "Term\tOverlap\tP-value\tAdjusted P-value\tGenes\n\
                      Apoptosis\t2/87\t0.001\t0.01\tTP53;BAX\n";
        let table = String::from_utf8(tag_with_library(export, &library).unwrap()).unwrap();
        let mut lines = table.lines();
        assert_eq!(
            lines.next(),
            Some("Gene_set\tTerm\tOverlap\tP-value\tAdjusted P-value\tGenes")
        );
        assert_eq!(
            lines.next(),
            Some("KEGG_2019_Human\tApoptosis\t2/87\t0.001\t0.01\tTP53;BAX")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn tag_with_library_empty_export() {
        let library: GeneSetLibrary = "KEGG_2019_Human".parse().unwrap();
        assert!(tag_with_library("", &library).unwrap().is_empty());
    }

    #[test]
    fn fragment_name_uses_library() {
        let library: GeneSetLibrary = "Reactome_2016".parse().unwrap();
        assert_eq!(
            fragment_file_name(&library),
            "Reactome_2016.enrichr.enrichr.reports.txt"
        );
    }
}

use super::loan_terms::{HouseLoanTerms, StructuredLoanDocument};
use super::SchemaExtractor;
use crate::error::{PipelineError, Result};
use crate::storage::{loan_terms_blob_name, BlobStore};
use crate::types::AnalysisResult;
use tracing::{debug, info};

/// Flatten a document to the text the extractor sees.
///
/// Each line's text is trimmed and all lines, page by page, are joined with
/// a single space. Tables and geometry are not included.
pub fn consolidate_text(result: &AnalysisResult) -> String {
    result
        .pages
        .iter()
        .flat_map(|page| page.lines.iter())
        .map(|line| line.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns an `AnalysisResult` into a `StructuredLoanDocument`.
pub struct SchemaReducer {
    extractor: Box<dyn SchemaExtractor>,
}

impl SchemaReducer {
    pub fn new(extractor: Box<dyn SchemaExtractor>) -> Self {
        Self { extractor }
    }

    pub fn reduce(&self, result: &AnalysisResult) -> Result<StructuredLoanDocument> {
        let text = consolidate_text(result);
        debug!(
            extractor = self.extractor.name(),
            chars = text.len(),
            "requesting loan terms extraction"
        );

        let record = self
            .extractor
            .extract(&text, &HouseLoanTerms::SCHEMA)
            .map_err(|e| match e {
                PipelineError::SchemaExtraction(_) => e,
                other => PipelineError::SchemaExtraction(other.to_string()),
            })?;

        let content = HouseLoanTerms::try_from(record)?;
        Ok(StructuredLoanDocument::new(content))
    }

    /// Reduce a persisted `*_results.json` blob and write the structured
    /// document next to it. Returns the name of the written blob.
    pub fn reduce_blob(&self, store: &dyn BlobStore, results_name: &str) -> Result<String> {
        let output_name = loan_terms_blob_name(results_name).ok_or_else(|| {
            PipelineError::UnsupportedFormat {
                name: results_name.to_string(),
            }
        })?;

        let result = AnalysisResult::from_json_slice(&store.read(results_name)?)?;
        let document = self.reduce(&result)?;
        store.write(&output_name, &document.to_pretty_json()?)?;

        info!(source = results_name, output = %output_name, "structured document written");
        Ok(output_name)
    }
}

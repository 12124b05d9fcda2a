//! Schema extraction
//!
//! Reduces a canonical `AnalysisResult` to a fixed-schema record by sending
//! its flattened text to a language-model service.
//!
//! ```text
//! AnalysisResult
//!     ↓  consolidate_text
//! flat text
//!     ↓  [SchemaExtractor backend] + OutputSchema
//! JSON record
//!     ↓  HouseLoanTerms::try_from
//! StructuredLoanDocument {id, content}
//! ```

pub mod backends;
pub mod loan_terms;
pub mod reducer;

use crate::error::Result;
use serde_json::{json, Map, Value};

pub use loan_terms::{HouseLoanTerms, StructuredLoanDocument, DOCUMENT_ID};
pub use reducer::{consolidate_text, SchemaReducer};

#[cfg(feature = "azure-backend")]
pub use backends::AzureOpenAiExtractor;

/// A flat record of required string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

impl OutputSchema {
    /// Strict JSON schema: every field a required string, nothing else allowed.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.to_string(), json!({ "type": "string" })))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.fields,
            "additionalProperties": false,
        })
    }
}

/// Extractor trait - maps free text onto an `OutputSchema`
///
/// Implementations must ask for every field of the schema; validating the
/// returned record is left to the caller.
pub trait SchemaExtractor: Send + Sync {
    fn extract(&self, text: &str, schema: &OutputSchema) -> Result<Value>;

    /// Extractor identifier for logging
    fn name(&self) -> &str;
}

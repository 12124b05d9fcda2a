use super::OutputSchema;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope id of every structured loan document.
pub const DOCUMENT_ID: &str = "house_loan_terms";

/// The fixed loan-terms record. Every field is always present; a term the
/// source text does not mention is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HouseLoanTerms {
    pub introduction: String,
    pub loan_amount_and_purpose: String,
    pub interest_rates: String,
    pub loan_tenure: String,
    pub monthly_repayments: String,
    pub late_payments: String,
    pub loan_security: String,
    pub loan_processing_fees: String,
    pub default_and_foreclosure: String,
    pub early_repayment: String,
    pub changes_to_terms: String,
    pub insurance_requirements: String,
    pub loan_cancellation: String,
    pub dispute_resolution: String,
    pub governing_law: String,
    pub contact_information: String,
}

impl HouseLoanTerms {
    /// Field names in declaration (and serialization) order
    pub const FIELD_NAMES: [&'static str; 16] = [
        "introduction",
        "loan_amount_and_purpose",
        "interest_rates",
        "loan_tenure",
        "monthly_repayments",
        "late_payments",
        "loan_security",
        "loan_processing_fees",
        "default_and_foreclosure",
        "early_repayment",
        "changes_to_terms",
        "insurance_requirements",
        "loan_cancellation",
        "dispute_resolution",
        "governing_law",
        "contact_information",
    ];

    pub const SCHEMA: OutputSchema = OutputSchema {
        name: "HouseLoanTerms",
        fields: &Self::FIELD_NAMES,
    };

    pub fn json_schema() -> Value {
        Self::SCHEMA.to_json_schema()
    }
}

impl TryFrom<Value> for HouseLoanTerms {
    type Error = PipelineError;

    fn try_from(record: Value) -> Result<Self> {
        let object = record.as_object().ok_or_else(|| {
            PipelineError::SchemaExtraction("extractor record is not a JSON object".to_string())
        })?;

        // Field-level checks first so the error names the offending field
        for field in Self::FIELD_NAMES {
            match object.get(field) {
                None => {
                    return Err(PipelineError::SchemaExtraction(format!("missing field '{field}'")));
                }
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(PipelineError::SchemaExtraction(format!(
                        "field '{field}' is not a string: {other}"
                    )));
                }
            }
        }

        serde_json::from_value(record).map_err(|e| PipelineError::SchemaExtraction(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredLoanDocument {
    pub id: String,
    pub content: HouseLoanTerms,
}

impl StructuredLoanDocument {
    pub fn new(content: HouseLoanTerms) -> Self {
        Self {
            id: DOCUMENT_ID.to_string(),
            content,
        }
    }

    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        crate::types::to_pretty_json(self)
    }
}

//! Raw layout model as returned by the document-analysis provider.
//!
//! Field names follow the provider's camelCase JSON. Every collection is
//! optional on the wire and defaults to empty here, so a sparse response
//! degrades to an empty document instead of a parse error.

use crate::types::{LengthUnit, SelectionMarkState, Span};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalyzeResult {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub pages: Vec<RawPage>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub styles: Vec<RawStyle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    pub page_number: u32,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub unit: Option<LengthUnit>,
    #[serde(default)]
    pub words: Vec<RawWord>,
    #[serde(default)]
    pub lines: Vec<RawLine>,
    #[serde(default)]
    pub selection_marks: Vec<RawSelectionMark>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWord {
    pub content: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub span: Option<Span>,
    #[serde(default)]
    pub polygon: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLine {
    pub content: String,
    #[serde(default)]
    pub polygon: Vec<f64>,
    #[serde(default)]
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSelectionMark {
    pub state: SelectionMarkState,
    #[serde(default)]
    pub polygon: Vec<f64>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBoundingRegion {
    pub page_number: u32,
    #[serde(default)]
    pub polygon: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTableCell {
    pub row_index: u32,
    pub column_index: u32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Vec<RawBoundingRegion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    pub row_count: u32,
    pub column_count: u32,
    #[serde(default)]
    pub bounding_regions: Vec<RawBoundingRegion>,
    #[serde(default)]
    pub cells: Vec<RawTableCell>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyle {
    #[serde(default)]
    pub is_handwritten: Option<bool>,
    #[serde(default)]
    pub confidence: f64,
}

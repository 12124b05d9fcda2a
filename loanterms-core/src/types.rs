use crate::error::Result;
use serde::{Deserialize, Serialize};

// ===== GEOMETRY =====
// Polygons are opaque: they are copied through, never measured.

/// A single `[x, y]` coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point(pub f64, pub f64);

pub type Polygon = Vec<Point>;

impl Point {
    /// Pair up a flat `[x1, y1, x2, y2, ...]` coordinate list.
    /// A trailing odd coordinate is dropped.
    pub fn polygon_from_flat(coords: &[f64]) -> Polygon {
        coords
            .chunks_exact(2)
            .map(|pair| Point(pair[0], pair[1]))
            .collect()
    }
}

/// Half-open character range into the page text stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// One past the last character covered by this span, or `None` when the
    /// provider reported a span whose end does not fit in `usize`.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }
}

// ===== PAGE CONTENT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Pixel,
    Inch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMarkState {
    Selected,
    Unselected,
}

/// A recognized word as owned by its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub content: String,
    pub confidence: f64,
    /// Words without a span can never be matched to a line.
    pub span: Option<Span>,
}

/// The per-word view carried by a line: geometry is dropped, the line polygon is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineWord {
    pub content: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    pub polygon: Polygon,
    /// Derived from the page words; never authoritative.
    #[serde(default)]
    pub words: Vec<LineWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMark {
    pub state: SelectionMarkState,
    pub polygon: Polygon,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    /// 1-based, in provider encounter order
    #[serde(rename = "page_number")]
    pub number: u32,
    pub width: f64,
    pub height: f64,
    pub unit: LengthUnit,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub selection_marks: Vec<SelectionMark>,
    /// Owned page words. Not persisted: the line-level words carry them.
    #[serde(skip_serializing, default)]
    pub words: Vec<Word>,
}

// ===== TABLES =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub page_number: u32,
    pub polygon: Polygon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row_index: u32,
    pub column_index: u32,
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub row_count: u32,
    pub column_count: u32,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

// ===== CANONICAL DOCUMENT =====

/// Canonical document model produced by the assembler and table extractor.
///
/// Tables sit beside the pages, not inside them; they reference pages only
/// through their bounding regions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub handwritten: bool,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Serialize as UTF-8 JSON with a 4-space indent, the persisted artifact format.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

impl AnalysisResult {
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        to_pretty_json(self)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }
}

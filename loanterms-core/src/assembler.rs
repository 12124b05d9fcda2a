//! Document assembly: folds the provider's raw layout into the canonical model.
//!
//! Pages, lines and selection marks keep provider order. Nothing is sorted or
//! deduplicated, and missing optional collections become empty sequences.

use crate::analysis::layout::{RawAnalyzeResult, RawLine, RawPage, RawSelectionMark, RawStyle, RawWord};
use crate::span::SpanMatcher;
use crate::tables::TableExtractor;
use crate::types::*;
use tracing::debug;

pub struct DocumentAssembler {
    table_extractor: TableExtractor,
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self {
            table_extractor: TableExtractor::new(),
        }
    }

    /// Build the full canonical document: pages, tables and the handwritten flag.
    pub fn assemble(&self, raw: &RawAnalyzeResult) -> AnalysisResult {
        let pages: Vec<Page> = raw.pages.iter().map(|page| self.assemble_page(page)).collect();
        let tables = self.table_extractor.extract(raw);
        let handwritten = Self::detect_handwriting(&raw.styles);

        debug!(
            pages = pages.len(),
            tables = tables.len(),
            handwritten,
            "assembled analysis result"
        );

        AnalysisResult {
            handwritten,
            pages,
            tables,
        }
    }

    /// Logical OR over the style flags; no styles means not handwritten.
    pub fn detect_handwriting(styles: &[RawStyle]) -> bool {
        styles.iter().any(|style| style.is_handwritten.unwrap_or(false))
    }

    fn assemble_page(&self, raw_page: &RawPage) -> Page {
        let lines = raw_page
            .lines
            .iter()
            .map(|line| Self::assemble_line(line, &raw_page.words))
            .collect();

        let selection_marks = raw_page
            .selection_marks
            .iter()
            .map(Self::assemble_selection_mark)
            .collect();

        let words = raw_page
            .words
            .iter()
            .map(|word| Word {
                content: word.content.clone(),
                confidence: word.confidence,
                span: word.span,
            })
            .collect();

        Page {
            number: raw_page.page_number,
            width: raw_page.width,
            height: raw_page.height,
            unit: raw_page.unit.unwrap_or_default(),
            lines,
            selection_marks,
            words,
        }
    }

    /// Recompute a line's words from its spans against the page word list,
    /// keeping the provider's word order.
    fn assemble_line(raw_line: &RawLine, page_words: &[RawWord]) -> Line {
        Line {
            text: raw_line.content.clone(),
            polygon: Point::polygon_from_flat(&raw_line.polygon),
            words: Self::words_in_line(page_words, &raw_line.spans),
        }
    }

    pub fn words_in_line(page_words: &[RawWord], line_spans: &[Span]) -> Vec<LineWord> {
        if page_words.is_empty() || line_spans.is_empty() {
            return Vec::new();
        }

        page_words
            .iter()
            .filter(|word| SpanMatcher::contains(word.span.as_ref(), line_spans))
            .map(|word| LineWord {
                content: word.content.clone(),
                confidence: word.confidence,
            })
            .collect()
    }

    fn assemble_selection_mark(raw_mark: &RawSelectionMark) -> SelectionMark {
        SelectionMark {
            state: raw_mark.state,
            polygon: Point::polygon_from_flat(&raw_mark.polygon),
            confidence: raw_mark.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(content: &str, offset: usize, length: usize) -> RawWord {
        RawWord {
            content: content.to_string(),
            confidence: 0.95,
            span: Some(Span::new(offset, length)),
            polygon: vec![],
        }
    }

    fn line(content: &str, spans: Vec<Span>) -> RawLine {
        RawLine {
            content: content.to_string(),
            polygon: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            spans,
        }
    }

    fn hello_world_page() -> RawPage {
        RawPage {
            page_number: 1,
            width: 8.5,
            height: 11.0,
            unit: Some(LengthUnit::Inch),
            words: vec![word("Hello", 0, 5), word("world", 6, 5)],
            lines: vec![
                line("Hello", vec![Span::new(0, 5)]),
                line("world", vec![Span::new(6, 5)]),
            ],
            selection_marks: vec![],
        }
    }

    fn contents(line: &Line) -> Vec<&str> {
        line.words.iter().map(|w| w.content.as_str()).collect()
    }

    #[test]
    fn test_words_are_not_cross_assigned() {
        let raw = RawAnalyzeResult {
            pages: vec![hello_world_page()],
            ..Default::default()
        };
        let result = DocumentAssembler::new().assemble(&raw);

        let page = &result.pages[0];
        assert_eq!(page.number, 1);
        assert_eq!(page.unit, LengthUnit::Inch);
        assert_eq!(contents(&page.lines[0]), vec!["Hello"]);
        assert_eq!(contents(&page.lines[1]), vec!["world"]);
        assert_eq!(page.words.len(), 2);
    }

    #[test]
    fn test_partial_overlap_is_excluded() {
        let words = vec![word("Hel", 0, 3), word("lo wo", 3, 5)];
        let matched = DocumentAssembler::words_in_line(&words, &[Span::new(0, 5)]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].content, "Hel");
    }

    #[test]
    fn test_word_order_follows_provider_not_spans() {
        let words = vec![word("second", 10, 6), word("first", 0, 5)];
        let spans = vec![Span::new(0, 5), Span::new(10, 6)];
        let matched = DocumentAssembler::words_in_line(&words, &spans);
        let names: Vec<_> = matched.iter().map(|w| w.content.as_str()).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let raw = RawAnalyzeResult {
            pages: vec![hello_world_page()],
            ..Default::default()
        };
        let assembler = DocumentAssembler::new();
        assert_eq!(assembler.assemble(&raw), assembler.assemble(&raw));
    }

    #[test]
    fn test_line_without_spans_has_no_words() {
        let mut page = hello_world_page();
        page.lines[0].spans.clear();
        let raw = RawAnalyzeResult {
            pages: vec![page],
            ..Default::default()
        };
        let result = DocumentAssembler::new().assemble(&raw);
        assert!(result.pages[0].lines[0].words.is_empty());
    }

    #[test]
    fn test_provider_span_past_usize_range_is_unmatched() {
        let raw: RawAnalyzeResult = serde_json::from_value(serde_json::json!({
            "pages": [{
                "pageNumber": 1,
                "words": [
                    {"content": "Hello", "confidence": 0.9, "span": {"offset": 0, "length": 5}},
                    {"content": "junk", "confidence": 0.1, "span": {"offset": usize::MAX, "length": 1}}
                ],
                "lines": [{"content": "Hello", "spans": [{"offset": 0, "length": 5}]}]
            }]
        }))
        .unwrap();

        let result = DocumentAssembler::new().assemble(&raw);
        assert_eq!(contents(&result.pages[0].lines[0]), vec!["Hello"]);
        assert_eq!(result.pages[0].words.len(), 2);
    }

    #[test]
    fn test_empty_raw_result() {
        let result = DocumentAssembler::new().assemble(&RawAnalyzeResult::default());
        assert_eq!(result, AnalysisResult::default());
        assert!(!result.handwritten);
    }

    #[test]
    fn test_handwritten_is_or_over_styles() {
        let printed = RawStyle {
            is_handwritten: Some(false),
            confidence: 0.9,
        };
        let unknown = RawStyle::default();
        let written = RawStyle {
            is_handwritten: Some(true),
            confidence: 0.8,
        };

        assert!(!DocumentAssembler::detect_handwriting(&[]));
        assert!(!DocumentAssembler::detect_handwriting(&[printed.clone(), unknown]));
        assert!(DocumentAssembler::detect_handwriting(&[printed, written]));
    }

    #[test]
    fn test_selection_marks_copied_verbatim() {
        let mut page = hello_world_page();
        page.selection_marks = vec![RawSelectionMark {
            state: SelectionMarkState::Unselected,
            polygon: vec![1.0, 2.0, 3.0, 4.0],
            confidence: 0.42,
        }];
        let raw = RawAnalyzeResult {
            pages: vec![page],
            ..Default::default()
        };
        let result = DocumentAssembler::new().assemble(&raw);
        let mark = &result.pages[0].selection_marks[0];
        assert_eq!(mark.state, SelectionMarkState::Unselected);
        assert_eq!(mark.polygon, vec![Point(1.0, 2.0), Point(3.0, 4.0)]);
        assert_eq!(mark.confidence, 0.42);
    }

    #[test]
    fn test_missing_unit_defaults_to_pixel() {
        let mut page = hello_world_page();
        page.unit = None;
        let raw = RawAnalyzeResult {
            pages: vec![page],
            ..Default::default()
        };
        let result = DocumentAssembler::new().assemble(&raw);
        assert_eq!(result.pages[0].unit, LengthUnit::Pixel);
    }
}

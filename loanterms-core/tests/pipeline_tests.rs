//! Pipeline boundary tests.
//!
//! The raw layout fixture in `test_fixtures/layout/` is a trimmed provider
//! response for a two-page loan agreement. It is driven through the full
//! pipeline with in-memory and filesystem stores and stub services, and the
//! tests assert structural properties at each boundary:
//!
//! - Boundary 1 (raw layout → AnalysisResult): pages, line words, tables, flags
//! - Boundary 2 (persisted `_results.json`): key names, indent, page words dropped
//! - Boundary 3 (StructuredLoanDocument): flattened text, envelope, failures
//!
//! No network access required.

use loanterms_core::storage::{BlobStore, FileBlobStore, MemoryBlobStore};
use loanterms_core::{
    AnalysisResult, DocumentAnalyzer, DocumentAssembler, ErrorKind, HouseLoanTerms, ItemOutcome, LengthUnit,
    OutputSchema, PipelineDriver, PipelineError, RawAnalyzeResult, Result, SchemaExtractor, SchemaReducer,
    SelectionMarkState,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures/layout")
}

fn load_raw(fixture_name: &str) -> RawAnalyzeResult {
    let path = fixtures_dir().join(fixture_name);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Missing fixture: {}", path.display()));
    serde_json::from_str(&contents).expect("Invalid raw layout fixture")
}

const CORRUPT: &[u8] = b"corrupt";

/// Returns the fixture layout for any document except `CORRUPT`, for which
/// the provider yields nothing.
struct FixtureAnalyzer {
    raw: RawAnalyzeResult,
    calls: Arc<AtomicUsize>,
}

impl FixtureAnalyzer {
    fn new(raw: RawAnalyzeResult) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                raw,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl DocumentAnalyzer for FixtureAnalyzer {
    fn analyze(&self, document: &[u8]) -> Result<RawAnalyzeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if document == CORRUPT {
            return Err(PipelineError::ProviderAnalysis("operation failed: InvalidContent".into()));
        }
        Ok(self.raw.clone())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

/// Fills every requested field, minus `omit`, and records the text it saw.
struct RecordingExtractor {
    omit: Option<&'static str>,
    texts: Arc<Mutex<Vec<String>>>,
}

impl SchemaExtractor for RecordingExtractor {
    fn extract(&self, text: &str, schema: &OutputSchema) -> Result<Value> {
        self.texts.lock().unwrap().push(text.to_string());
        let record: Map<String, Value> = schema
            .fields
            .iter()
            .filter(|f| Some(**f) != self.omit)
            .map(|f| (f.to_string(), json!("")))
            .collect();
        Ok(Value::Object(record))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn reducer(omit: Option<&'static str>) -> (SchemaReducer, Arc<Mutex<Vec<String>>>) {
    let texts = Arc::new(Mutex::new(Vec::new()));
    let extractor = RecordingExtractor {
        omit,
        texts: Arc::clone(&texts),
    };
    (SchemaReducer::new(Box::new(extractor)), texts)
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Boundary 1: raw layout → AnalysisResult
// ============================================================================

#[test]
fn test_fixture_pages_and_units() {
    let result = DocumentAssembler::new().assemble(&load_raw("loan_agreement.json"));

    let numbers: Vec<u32> = result.pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(result.pages[0].unit, LengthUnit::Inch);
    // Page 2 reports no unit
    assert_eq!(result.pages[1].unit, LengthUnit::Pixel);
    assert_eq!(result.line_count(), 4);
}

#[test]
fn test_fixture_line_words_follow_spans() {
    let result = DocumentAssembler::new().assemble(&load_raw("loan_agreement.json"));

    let words = |page: usize, line: usize| -> Vec<String> {
        result.pages[page].lines[line]
            .words
            .iter()
            .map(|w| w.content.clone())
            .collect()
    };

    assert_eq!(words(0, 0), vec!["HOME", "LOAN", "AGREEMENT"]);
    assert_eq!(words(0, 1), vec!["Principal:", "$250,000"]);
    // "p.a." straddles the end of the line span and gets no partial credit
    assert_eq!(words(1, 0), vec!["Interest", "rate", "6.5%"]);
    // A line without spans never gets words
    assert!(words(1, 1).is_empty());
}

#[test]
fn test_fixture_marks_tables_and_handwriting() {
    let result = DocumentAssembler::new().assemble(&load_raw("loan_agreement.json"));

    let marks = &result.pages[0].selection_marks;
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0].state, SelectionMarkState::Selected);
    assert_eq!(marks[0].polygon.len(), 4);
    assert!(result.pages[1].selection_marks.is_empty());

    assert_eq!(result.tables.len(), 1);
    let table = &result.tables[0];
    assert_eq!((table.row_count, table.column_count), (2, 2));
    assert_eq!(table.bounding_regions[0].page_number, 1);
    let contents: Vec<&str> = table.cells.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["Term", "Value", "Tenure", "25 years"]);
    assert!(table.cells[3].bounding_regions.is_empty());

    assert!(result.handwritten);
}

#[test]
fn test_assembly_is_deterministic() {
    let raw = load_raw("loan_agreement.json");
    let assembler = DocumentAssembler::new();
    let first = assembler.assemble(&raw).to_pretty_json().unwrap();
    let second = assembler.assemble(&raw).to_pretty_json().unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Boundary 2: PipelineDriver and the persisted result
// ============================================================================

#[test]
fn test_batch_isolates_failures_and_skips() {
    let store = MemoryBlobStore::with_blobs([
        ("loan.pdf", b"%PDF-1.7".to_vec()),
        ("scan.png", CORRUPT.to_vec()),
        ("terms.JPG", b"jpeg bytes".to_vec()),
        ("notes.txt", b"not a scan".to_vec()),
    ]);
    let (analyzer, calls) = FixtureAnalyzer::new(load_raw("loan_agreement.json"));
    let driver = PipelineDriver::new(Box::new(store), Box::new(analyzer));

    let report = driver
        .run(&names(&["loan.pdf", "scan.png", "terms.JPG", "notes.txt"]))
        .unwrap();

    assert_eq!(report.persisted(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 1);
    assert!(matches!(
        report.outcome("scan.png"),
        Some(ItemOutcome::Failed { kind: ErrorKind::ProviderAnalysis, .. })
    ));
    assert!(matches!(report.outcome("notes.txt"), Some(ItemOutcome::Skipped { .. })));

    // The unsupported item never reaches the analyzer
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let store = driver.store();
    assert!(store.read("loan.pdf_results.json").is_ok());
    assert!(store.read("terms.JPG_results.json").is_ok());
    assert!(store.read("scan.png_results.json").is_err());
    assert!(store.read("notes.txt_results.json").is_err());
}

#[test]
fn test_persisted_result_format() {
    let store = MemoryBlobStore::with_blobs([("loan.pdf", b"%PDF".to_vec())]);
    let (analyzer, _) = FixtureAnalyzer::new(load_raw("loan_agreement.json"));
    let driver = PipelineDriver::new(Box::new(store), Box::new(analyzer));
    driver.run_container().unwrap();

    let bytes = driver.store().read("loan.pdf_results.json").unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("{\n    \"handwritten\": true,"));

    let value: Value = serde_json::from_str(&text).unwrap();
    let page = &value["pages"][0];
    assert_eq!(page["page_number"], 1);
    assert_eq!(page["unit"], "inch");
    assert!(page.get("words").is_none());
    assert_eq!(page["lines"][0]["text"], "HOME LOAN AGREEMENT");
    assert_eq!(page["lines"][0]["words"][0], json!({"content": "HOME", "confidence": 0.998}));
    assert_eq!(page["lines"][0]["polygon"][0], json!([1.0, 1.0]));
    assert_eq!(page["selection_marks"][0]["state"], "selected");

    let cell = &value["tables"][0]["cells"][0];
    assert_eq!(cell["row_index"], 0);
    assert_eq!(cell["bounding_regions"][0]["page_number"], 1);

    // Reads back into the canonical model
    let restored = AnalysisResult::from_json_slice(text.as_bytes()).unwrap();
    assert_eq!(restored.pages.len(), 2);
    assert!(restored.pages[0].words.is_empty());
}

#[test]
fn test_empty_provider_output() {
    let store = MemoryBlobStore::with_blobs([("blank.tiff", b"II*".to_vec())]);
    let (analyzer, _) = FixtureAnalyzer::new(RawAnalyzeResult::default());
    let driver = PipelineDriver::new(Box::new(store), Box::new(analyzer));
    driver.run(&names(&["blank.tiff"])).unwrap();

    let value: Value = serde_json::from_slice(&driver.store().read("blank.tiff_results.json").unwrap()).unwrap();
    assert_eq!(value, json!({"handwritten": false, "pages": [], "tables": []}));
}

#[test]
fn test_rerun_overwrites_results() {
    let store = MemoryBlobStore::with_blobs([("loan.pdf", b"%PDF".to_vec())]);
    let (analyzer, calls) = FixtureAnalyzer::new(load_raw("loan_agreement.json"));
    let driver = PipelineDriver::new(Box::new(store), Box::new(analyzer));

    let first = driver.run_container().unwrap();
    let second = driver.run_container().unwrap();

    assert_ne!(first.run_id, second.run_id);
    // The first run's artifact is not picked up as a source the second time
    assert_eq!(second.items.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_file_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("2024")).unwrap();
    std::fs::write(dir.path().join("2024/loan.pdf"), b"%PDF").unwrap();
    std::fs::write(dir.path().join("readme.md"), b"# notes").unwrap();

    let store = FileBlobStore::new(dir.path()).unwrap();
    let (analyzer, _) = FixtureAnalyzer::new(load_raw("loan_agreement.json"));
    let driver = PipelineDriver::new(Box::new(store), Box::new(analyzer)).with_workers(2);

    let report = driver.run_container().unwrap();
    assert_eq!(report.persisted(), 1);
    assert_eq!(report.skipped(), 1);
    assert!(dir.path().join("2024/loan.pdf_results.json").is_file());
}

// ============================================================================
// Boundary 3: SchemaReducer
// ============================================================================

#[test]
fn test_reduce_fixture_text() {
    let result = DocumentAssembler::new().assemble(&load_raw("loan_agreement.json"));
    let (reducer, texts) = reducer(None);

    let document = reducer.reduce(&result).unwrap();
    assert_eq!(document.id, "house_loan_terms");
    assert_eq!(document.content, HouseLoanTerms::default());
    assert_eq!(
        *texts.lock().unwrap(),
        vec!["HOME LOAN AGREEMENT Principal: $250,000 Interest rate 6.5% Signature".to_string()]
    );
}

#[test]
fn test_missing_field_yields_no_document() {
    let store = MemoryBlobStore::with_blobs([("loan.pdf", b"%PDF".to_vec())]);
    let (analyzer, _) = FixtureAnalyzer::new(load_raw("loan_agreement.json"));
    let driver = PipelineDriver::new(Box::new(store), Box::new(analyzer));
    driver.run_container().unwrap();

    let (reducer, _) = reducer(Some("contact_information"));
    let err = reducer
        .reduce_blob(driver.store(), "loan.pdf_results.json")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaExtraction);
    assert!(driver.store().read("loan.pdf_loan_terms.json").is_err());
}

#[test]
fn test_reduce_blob_persists_envelope() {
    let store = MemoryBlobStore::with_blobs([("loan.pdf", b"%PDF".to_vec())]);
    let (analyzer, _) = FixtureAnalyzer::new(load_raw("loan_agreement.json"));
    let driver = PipelineDriver::new(Box::new(store), Box::new(analyzer));
    driver.run_container().unwrap();

    let (reducer, _) = reducer(None);
    let written = reducer.reduce_blob(driver.store(), "loan.pdf_results.json").unwrap();
    assert_eq!(written, "loan.pdf_loan_terms.json");

    let value: Value = serde_json::from_slice(&driver.store().read(&written).unwrap()).unwrap();
    assert_eq!(value["id"], "house_loan_terms");
    let content = value["content"].as_object().unwrap();
    for field in HouseLoanTerms::FIELD_NAMES {
        assert!(content.contains_key(field), "missing {field}");
    }
}

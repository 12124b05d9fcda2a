// Loanterms Core Library
//
// Rebuilds the layout of analyzed loan documents (pages, lines, words,
// selection marks, tables) and reduces it to a fixed loan-terms record.
// External services sit behind the BlobStore, DocumentAnalyzer and
// SchemaExtractor traits.

pub mod analysis;
pub mod assembler;
pub mod config;
pub mod error;
pub mod extraction;
pub mod processor;
pub mod retry;
pub mod span;
pub mod storage;
pub mod tables;
pub mod types;

#[cfg(feature = "azure-backend")]
pub mod http;

// Re-export main types and functions for easy use
pub use types::*;
pub use analysis::{DocumentAnalyzer, RawAnalyzeResult};
pub use assembler::DocumentAssembler;
pub use config::{PipelineConfig, StorageAccount};
pub use error::{ErrorKind, PipelineError, Result};
pub use extraction::{
    consolidate_text, HouseLoanTerms, OutputSchema, SchemaExtractor, SchemaReducer, StructuredLoanDocument,
};
pub use processor::{BatchReport, ItemOutcome, ItemReport, PipelineDriver};
pub use retry::RetryPolicy;
pub use span::SpanMatcher;
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use tables::TableExtractor;

// Re-export backends for direct use
#[cfg(feature = "azure-backend")]
pub use analysis::AzureLayoutAnalyzer;
#[cfg(feature = "azure-backend")]
pub use extraction::AzureOpenAiExtractor;
#[cfg(feature = "azure-backend")]
pub use http::HttpClient;
#[cfg(feature = "azure-backend")]
pub use storage::AzureBlobStore;

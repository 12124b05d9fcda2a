//! Document analysis
//!
//! This module is the boundary between the external layout-analysis service
//! and the canonical document model.
//!
//! ## Architecture
//!
//! ```text
//! Document bytes (PDF, JPEG, PNG, TIFF)
//!     ↓
//! [DocumentAnalyzer backend]
//!     ↓
//! RawAnalyzeResult (provider shape)
//!     ↓
//! [DocumentAssembler + TableExtractor]
//!     ↓
//! AnalysisResult
//! ```
//!
//! ## Available Backends
//!
//! - `AzureLayoutAnalyzer` - Azure Document Intelligence `prebuilt-layout`

pub mod backends;
pub mod layout;

use crate::error::Result;

pub use layout::RawAnalyzeResult;

#[cfg(feature = "azure-backend")]
pub use backends::AzureLayoutAnalyzer;

/// Analyzer trait - converts document bytes to the provider's raw layout
///
/// Implementations own their transport (timeouts, retries, polling).
/// Everything after this point works with `RawAnalyzeResult` and is
/// provider-agnostic.
pub trait DocumentAnalyzer: Send + Sync {
    /// Submit document bytes under the analyzer's fixed analysis mode
    fn analyze(&self, document: &[u8]) -> Result<RawAnalyzeResult>;

    /// Analyzer identifier for logging
    fn name(&self) -> &str;
}

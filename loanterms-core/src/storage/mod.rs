//! Blob storage abstraction for source documents and pipeline artifacts
//!
//! - `AzureBlobStore` - blob container addressed through SAS-signed URLs
//! - `FileBlobStore` - local directory, `file://` read handles
//! - `MemoryBlobStore` - in-process store for tests and dry runs

pub mod file;
pub mod memory;

#[cfg(feature = "azure-backend")]
pub mod azure;
#[cfg(feature = "azure-backend")]
pub mod sas;

use crate::error::Result;
use std::time::Duration;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;

#[cfg(feature = "azure-backend")]
pub use azure::AzureBlobStore;

/// Extensions the layout service accepts, matched case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = [".pdf", ".jpeg", ".jpg", ".png", ".tiff"];

/// Suffix appended to a source name for its persisted analysis result.
pub const RESULTS_SUFFIX: &str = "_results.json";

/// Suffix appended to a result stem for its structured loan-terms document.
pub const LOAN_TERMS_SUFFIX: &str = "_loan_terms.json";

/// Lifetime of the internal handle used by `BlobStore::read`.
const INTERNAL_READ_TTL: Duration = Duration::from_secs(300);

pub fn is_supported_format(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub fn results_blob_name(source_name: &str) -> String {
    format!("{source_name}{RESULTS_SUFFIX}")
}

/// `"scan.pdf_results.json"` → `"scan.pdf_loan_terms.json"`; `None` for non-result blobs.
pub fn loan_terms_blob_name(results_name: &str) -> Option<String> {
    results_name
        .strip_suffix(RESULTS_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("{stem}{LOAN_TERMS_SUFFIX}"))
}

/// Storage abstraction over a flat namespace of named blobs.
///
/// Reads go through time-boxed signed handles so that the fetch step never
/// needs ambient credentials.
pub trait BlobStore: Send + Sync {
    /// Names of all blobs, in the store's listing order
    fn list(&self) -> Result<Vec<String>>;

    /// Signed read-only URL for `name`, valid for `ttl`
    fn generate_read_url(&self, name: &str, ttl: Duration) -> Result<String>;

    /// Fetch the bytes behind a handle produced by `generate_read_url`
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Create or overwrite `name`
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Convenience read through a short-lived handle
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.generate_read_url(name, INTERNAL_READ_TTL)?;
        self.fetch(&url)
    }

    /// Store identifier for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_formats_are_case_insensitive() {
        assert!(is_supported_format("loan.PDF"));
        assert!(is_supported_format("scan.Jpeg"));
        assert!(is_supported_format("folder/page.tiff"));
        assert!(!is_supported_format("notes.txt"));
        assert!(!is_supported_format("scan.pdf_results.json"));
        assert!(!is_supported_format("pdf"));
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(results_blob_name("loan.pdf"), "loan.pdf_results.json");
        assert_eq!(
            loan_terms_blob_name("loan.pdf_results.json").as_deref(),
            Some("loan.pdf_loan_terms.json")
        );
        assert_eq!(loan_terms_blob_name("loan.pdf"), None);
        assert_eq!(loan_terms_blob_name("_results.json"), None);
    }
}

//! Layout analysis backends
//!
//! Each backend implements `DocumentAnalyzer` and owns its own transport.

#[cfg(feature = "azure-backend")]
pub mod azure;

#[cfg(feature = "azure-backend")]
pub use azure::AzureLayoutAnalyzer;

//! Schema extractor backends

#[cfg(feature = "azure-backend")]
pub mod azure_openai;

#[cfg(feature = "azure-backend")]
pub use azure_openai::AzureOpenAiExtractor;

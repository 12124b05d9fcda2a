use super::BlobStore;
use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

const URL_SCHEME: &str = "memory://";

/// In-process blob store. Handles are `memory://<name>` and never expire.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blobs<I, N, D>(blobs: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        let store = Self::new();
        if let Ok(mut map) = store.blobs.write() {
            map.extend(blobs.into_iter().map(|(n, d)| (n.into(), d.into())));
        }
        store
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.read().ok()?.get(name).cloned()
    }

    fn lock_error() -> PipelineError {
        PipelineError::item_processing("memory store", 1, "store lock poisoned")
    }
}

impl BlobStore for MemoryBlobStore {
    fn list(&self) -> Result<Vec<String>> {
        let map = self.blobs.read().map_err(|_| Self::lock_error())?;
        Ok(map.keys().cloned().collect())
    }

    fn generate_read_url(&self, name: &str, _ttl: Duration) -> Result<String> {
        Ok(format!("{URL_SCHEME}{name}"))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let name = url.strip_prefix(URL_SCHEME).ok_or_else(|| {
            PipelineError::item_processing("fetch", 1, format!("not a memory handle: {url}"))
        })?;
        self.get(name)
            .ok_or_else(|| PipelineError::item_processing("fetch", 1, format!("blob not found: {name}")))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let mut map = self.blobs.write().map_err(|_| Self::lock_error())?;
        map.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "MemoryBlobStore"
    }
}

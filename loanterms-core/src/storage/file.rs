use super::BlobStore;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const URL_SCHEME: &str = "file://";
const EXPIRY_PARAM: &str = "?se=";

/// Local directory acting as a blob container.
///
/// Blob names are paths relative to the root, `/`-separated. Read handles are
/// `file://` URLs carrying an `se=` expiry that `fetch` enforces, so the
/// pipeline sees the same time-boxed semantics as with the cloud store.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if name.is_empty() || escapes {
            return Err(PipelineError::item_processing(
                "resolve blob",
                1,
                format!("invalid blob name: {name}"),
            ));
        }
        Ok(self.root.join(relative))
    }

    fn collect_names(&self, dir: &Path, names: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_names(&path, names)?;
            } else if let Ok(relative) = path.strip_prefix(&self.root) {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                names.push(name);
            }
        }
        Ok(())
    }

    fn parse_handle(url: &str) -> Result<(PathBuf, DateTime<Utc>)> {
        let invalid = || PipelineError::item_processing("fetch", 1, format!("not a file handle: {url}"));

        let rest = url.strip_prefix(URL_SCHEME).ok_or_else(invalid)?;
        let (path, expiry) = rest.rsplit_once(EXPIRY_PARAM).ok_or_else(invalid)?;
        let expiry = DateTime::parse_from_rfc3339(expiry)
            .map_err(|_| invalid())?
            .with_timezone(&Utc);
        Ok((PathBuf::from(path), expiry))
    }
}

impl BlobStore for FileBlobStore {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.collect_names(&self.root, &mut names)?;
        names.sort();
        Ok(names)
    }

    fn generate_read_url(&self, name: &str, ttl: Duration) -> Result<String> {
        let path = self.blob_path(name)?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| PipelineError::Configuration(format!("invalid read URL ttl: {e}")))?;
        let expiry = (Utc::now() + ttl).to_rfc3339_opts(SecondsFormat::Secs, true);
        Ok(format!("{URL_SCHEME}{}{EXPIRY_PARAM}{expiry}", path.display()))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let (path, expiry) = Self::parse_handle(url)?;
        let inside_root = path
            .strip_prefix(&self.root)
            .is_ok_and(|relative| relative.components().all(|c| matches!(c, Component::Normal(_))));
        if !inside_root {
            return Err(PipelineError::item_processing(
                "fetch",
                1,
                format!("handle points outside {}: {url}", self.root.display()),
            ));
        }
        if Utc::now() > expiry {
            return Err(PipelineError::item_processing(
                "fetch",
                1,
                format!("read handle expired at {expiry}"),
            ));
        }
        Ok(fs::read(path)?)
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.blob_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "FileBlobStore"
    }
}

//! Azure Blob Storage backend
//!
//! Every request is authorized with a short-lived service SAS rather than
//! shared-key headers, so the same signer covers listing, reads and writes.

use super::sas::{permissions, SasRequest, SasSigner};
use super::BlobStore;
use crate::config::StorageAccount;
use crate::error::{PipelineError, Result};
use crate::http::{read_bytes, read_string, HttpClient};
use chrono::{Duration as ChronoDuration, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

// Pre-compiled regexes for the container listing XML
static BLOB_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Blob>.*?<Name>([^<]*)</Name>").unwrap());

static NEXT_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<NextMarker>([^<]+)</NextMarker>").unwrap());

static XML_ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|quot|apos|amp);").unwrap());

/// Backdate token start to tolerate clock skew between us and the service
const CLOCK_SKEW_MINUTES: i64 = 5;

/// Lifetime of the tokens used internally for listing and writing
const OPERATION_TOKEN_MINUTES: i64 = 15;

pub struct AzureBlobStore {
    base_url: String,
    container: String,
    signer: SasSigner,
    http: HttpClient,
}

impl AzureBlobStore {
    pub fn new(account: &StorageAccount, container: &str, http: HttpClient) -> Result<Self> {
        Ok(Self {
            base_url: account.blob_base_url(),
            container: container.to_string(),
            signer: SasSigner::new(account)?,
            http,
        })
    }

    fn blob_url(&self, name: &str) -> String {
        let encoded_path = name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}/{}", self.base_url, self.container, encoded_path)
    }

    fn token(&self, blob: Option<&str>, permissions: &str, ttl: ChronoDuration) -> Result<String> {
        let now = Utc::now();
        self.signer.sign(&SasRequest {
            container: &self.container,
            blob,
            permissions,
            start: now - ChronoDuration::minutes(CLOCK_SKEW_MINUTES),
            expiry: now + ttl,
        })
    }

    fn list_page(&self, marker: Option<&str>) -> Result<(Vec<String>, Option<String>)> {
        let token = self.token(
            None,
            permissions::LIST,
            ChronoDuration::minutes(OPERATION_TOKEN_MINUTES),
        )?;
        let mut url = format!(
            "{}/{}?restype=container&comp=list&{}",
            self.base_url, self.container, token
        );
        if let Some(marker) = marker {
            url.push_str("&marker=");
            url.push_str(&urlencoding::encode(marker));
        }

        let xml = self.http.execute(
            "list blobs",
            |agent| agent.get(&url).call(),
            |response| read_string("list blobs", response),
        )?;
        Ok(parse_blob_listing(&xml))
    }
}

impl BlobStore for AzureBlobStore {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let (page, next) = self.list_page(marker.as_deref())?;
            debug!(count = page.len(), has_more = next.is_some(), "listed blob page");
            names.extend(page);
            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        Ok(names)
    }

    fn generate_read_url(&self, name: &str, ttl: Duration) -> Result<String> {
        let ttl = ChronoDuration::from_std(ttl)
            .map_err(|e| PipelineError::Configuration(format!("invalid read URL ttl: {e}")))?;
        let token = self.token(Some(name), permissions::READ, ttl)?;
        Ok(format!("{}?{}", self.blob_url(name), token))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.http.execute(
            "fetch blob",
            |agent| agent.get(url).call(),
            |response| read_bytes("fetch blob", response),
        )
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let token = self.token(
            Some(name),
            permissions::CREATE_WRITE,
            ChronoDuration::minutes(OPERATION_TOKEN_MINUTES),
        )?;
        let url = format!("{}?{}", self.blob_url(name), token);
        let content_type = if name.ends_with(".json") {
            "application/json; charset=utf-8"
        } else {
            "application/octet-stream"
        };

        self.http.execute(
            "write blob",
            |agent| {
                agent
                    .put(&url)
                    .set("x-ms-blob-type", "BlockBlob")
                    .set("x-ms-version", super::sas::SAS_VERSION)
                    .set("Content-Type", content_type)
                    .send_bytes(data)
            },
            |_| Ok(()),
        )
    }

    fn name(&self) -> &str {
        "AzureBlobStore"
    }
}

/// Extract blob names and the continuation marker from a List Blobs response.
pub fn parse_blob_listing(xml: &str) -> (Vec<String>, Option<String>) {
    let names = BLOB_NAME_REGEX
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .collect();
    let next_marker = NEXT_MARKER_REGEX
        .captures(xml)
        .and_then(|cap| cap.get(1))
        .map(|m| unescape_xml(m.as_str()));
    (names, next_marker)
}

/// Decode the predefined entities and numeric character references in one
/// pass. A reference to an invalid code point is left as written.
fn unescape_xml(text: &str) -> String {
    XML_ENTITY_REGEX
        .replace_all(text, |caps: &Captures| {
            let decoded = match &caps[1] {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                reference => {
                    let code = match reference.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => reference[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

//! Service SAS signing for blob and container URLs.
//!
//! Signatures are HMAC-SHA256 over the version 2020-12-06 string-to-sign,
//! keyed with the base64-decoded account key.

use crate::config::StorageAccount;
use crate::error::{PipelineError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SAS_VERSION: &str = "2020-12-06";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Permission sets used by the pipeline.
pub mod permissions {
    pub const READ: &str = "r";
    pub const LIST: &str = "l";
    pub const CREATE_WRITE: &str = "cw";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasResource {
    Blob,
    Container,
}

impl SasResource {
    fn code(&self) -> &'static str {
        match self {
            SasResource::Blob => "b",
            SasResource::Container => "c",
        }
    }
}

/// One token request: what to sign, for how long, with which rights.
#[derive(Debug, Clone)]
pub struct SasRequest<'a> {
    pub container: &'a str,
    /// `None` signs the container itself
    pub blob: Option<&'a str>,
    pub permissions: &'a str,
    pub start: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl SasRequest<'_> {
    fn resource(&self) -> SasResource {
        if self.blob.is_some() {
            SasResource::Blob
        } else {
            SasResource::Container
        }
    }
}

pub struct SasSigner {
    account_name: String,
    key: Vec<u8>,
    protocol: String,
}

impl SasSigner {
    pub fn new(account: &StorageAccount) -> Result<Self> {
        let key = BASE64.decode(account.account_key.as_bytes()).map_err(|e| {
            PipelineError::Configuration(format!("AccountKey is not valid base64: {e}"))
        })?;
        // Emulator endpoints are plain http; production is https only
        let protocol = if account.blob_base_url().starts_with("https://") {
            "https"
        } else {
            "https,http"
        };
        Ok(Self {
            account_name: account.account_name.clone(),
            key,
            protocol: protocol.to_string(),
        })
    }

    fn canonicalized_resource(&self, request: &SasRequest) -> String {
        match request.blob {
            Some(blob) => format!("/blob/{}/{}/{}", self.account_name, request.container, blob),
            None => format!("/blob/{}/{}", self.account_name, request.container),
        }
    }

    pub fn string_to_sign(&self, request: &SasRequest) -> String {
        let start = request.start.format(TIME_FORMAT).to_string();
        let expiry = request.expiry.format(TIME_FORMAT).to_string();
        let resource = self.canonicalized_resource(request);
        [
            request.permissions,
            start.as_str(),
            expiry.as_str(),
            resource.as_str(),
            "", // signed identifier
            "", // signed IP
            self.protocol.as_str(),
            SAS_VERSION,
            request.resource().code(),
            "", // snapshot time
            "", // encryption scope
            "", // rscc
            "", // rscd
            "", // rsce
            "", // rscl
            "", // rsct
        ]
        .join("\n")
    }

    pub fn signature(&self, request: &SasRequest) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| PipelineError::Configuration(format!("HMAC key error: {e}")))?;
        mac.update(self.string_to_sign(request).as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Query string (without leading `?`) granting `request`.
    pub fn sign(&self, request: &SasRequest) -> Result<String> {
        let signature = self.signature(request)?;
        let start = request.start.format(TIME_FORMAT).to_string();
        let expiry = request.expiry.format(TIME_FORMAT).to_string();
        Ok(format!(
            "sv={}&sr={}&sp={}&st={}&se={}&spr={}&sig={}",
            SAS_VERSION,
            request.resource().code(),
            request.permissions,
            urlencoding::encode(&start),
            urlencoding::encode(&expiry),
            urlencoding::encode(&self.protocol),
            urlencoding::encode(&signature),
        ))
    }
}

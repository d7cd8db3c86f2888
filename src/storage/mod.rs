pub mod conditional;
pub mod filesystem;

use crate::{error::Result, range::ByteRange, utils::format_http_date};
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::io::AsyncRead;
use tracing::warn;

pub use conditional::Conditional;
pub use filesystem::FileSystemStore;

pub type ObjectBody = Box<dyn AsyncRead + Send + Unpin>;

/// Standard HTTP headers stored alongside an object and replayed on reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_expiry: Option<DateTime<Utc>>,
}

impl HttpMetadata {
    /// Copies every populated field onto `headers`.
    pub fn write_http_metadata(&self, headers: &mut HeaderMap) {
        let fields = [
            (header::CONTENT_TYPE, self.content_type.clone()),
            (header::CONTENT_LANGUAGE, self.content_language.clone()),
            (header::CONTENT_DISPOSITION, self.content_disposition.clone()),
            (header::CONTENT_ENCODING, self.content_encoding.clone()),
            (header::CACHE_CONTROL, self.cache_control.clone()),
            (header::EXPIRES, self.cache_expiry.as_ref().map(format_http_date)),
        ];

        for (name, value) in fields {
            if let Some(value) = value {
                insert_header(headers, name, &value);
            }
        }
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!("Skipping invalid stored value for header {}: {:?}", name, value),
    }
}

/// Everything known about an object except its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHead {
    pub key: String,
    pub version: String,
    pub size: u64,
    pub etag: String,
    pub http_etag: String,
    pub uploaded: DateTime<Utc>,
    pub storage_class: String,
    pub http_metadata: HttpMetadata,
    pub custom_metadata: HashMap<String, String>,
}

impl ObjectHead {
    pub fn write_http_metadata(&self, headers: &mut HeaderMap) {
        self.http_metadata.write_http_metadata(headers);
    }
}

/// Result of a `get`. `body` is `None` when the conditional criteria were not met.
pub struct StoredObject {
    pub head: ObjectHead,
    pub body: Option<ObjectBody>,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("head", &self.head)
            .field("body", &self.body.as_ref().map(|_| ".."))
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub range: Option<ByteRange>,
    /// Request headers, interpreted by the store as conditional criteria.
    pub only_if: HeaderMap,
}

/// Optional fields a listing may attach to each object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListInclude {
    CustomMetadata,
    HttpMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Page size; the store's default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub include: BTreeSet<ListInclude>,
}

/// An object as it appears in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedObject {
    pub key: String,
    pub version: String,
    pub size: u64,
    pub etag: String,
    pub http_etag: String,
    pub uploaded: DateTime<Utc>,
    pub storage_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_metadata: Option<HttpMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_metadata: Option<HashMap<String, String>>,
}

impl ListedObject {
    pub fn from_head(head: ObjectHead, include: &BTreeSet<ListInclude>) -> Self {
        Self {
            http_metadata: include
                .contains(&ListInclude::HttpMetadata)
                .then_some(head.http_metadata),
            custom_metadata: include
                .contains(&ListInclude::CustomMetadata)
                .then_some(head.custom_metadata),
            key: head.key,
            version: head.version,
            size: head.size,
            etag: head.etag,
            http_etag: head.http_etag,
            uploaded: head.uploaded,
            storage_class: head.storage_class,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub objects: Vec<ListedObject>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub delimited_prefixes: Vec<String>,
}

/// The bucket this service fronts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list(&self, options: &ListOptions) -> Result<Listing>;

    async fn get(&self, key: &str, options: &GetOptions) -> Result<Option<StoredObject>>;

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>>;
}

use super::{
    Conditional, GetOptions, HttpMetadata, ListOptions, ListedObject, Listing, ObjectBody,
    ObjectHead, ObjectStore, StoredObject,
};
use crate::{
    config::StorageConfig,
    error::{Error, Result},
    utils::quote_etag,
};
use anyhow::anyhow;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    io::SeekFrom,
    path::{Path, PathBuf},
};
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncSeekExt},
};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

const DATA_DIR: &str = "data";
const META_DIR: &str = "meta";
const STORAGE_CLASS: &str = "Standard";

/// Metadata persisted next to each object written through [`FileSystemStore::put`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    version: String,
    etag: String,
    uploaded: DateTime<Utc>,
    #[serde(default)]
    http_metadata: HttpMetadata,
    #[serde(default)]
    custom_metadata: HashMap<String, String>,
}

impl Sidecar {
    fn into_head(self, key: &str, size: u64) -> ObjectHead {
        ObjectHead {
            key: key.to_string(),
            version: self.version,
            size,
            http_etag: quote_etag(&self.etag),
            etag: self.etag,
            uploaded: self.uploaded,
            storage_class: STORAGE_CLASS.to_string(),
            http_metadata: self.http_metadata,
            custom_metadata: self.custom_metadata,
        }
    }
}

/// Object store backed by a local directory.
///
/// Object bytes live under `<root>/data/<key>` and their metadata under
/// `<root>/meta/<key>.json`. Files placed under `data/` without metadata are
/// still served, with an ETag computed from their content.
pub struct FileSystemStore {
    base_path: PathBuf,
    list_limit: usize,
}

impl FileSystemStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let base_path = config.path.clone();

        std::fs::create_dir_all(base_path.join(DATA_DIR))?;
        std::fs::create_dir_all(base_path.join(META_DIR))?;

        Ok(Self {
            base_path,
            list_limit: config.list_limit.max(1),
        })
    }

    fn data_root(&self) -> PathBuf {
        self.base_path.join(DATA_DIR)
    }

    fn object_path(&self, key: &str) -> Option<PathBuf> {
        let segments = key_segments(key)?;
        Some(segments.iter().fold(self.data_root(), |path, s| path.join(s)))
    }

    fn metadata_path(&self, key: &str) -> Option<PathBuf> {
        let segments = key_segments(key)?;
        let (last, parents) = segments.split_last()?;
        let dir = parents
            .iter()
            .fold(self.base_path.join(META_DIR), |path, s| path.join(s));
        Some(dir.join(format!("{}.json", last)))
    }

    async fn load_sidecar(&self, key: &str) -> Result<Option<Sidecar>> {
        let Some(path) = self.metadata_path(key) else {
            return Ok(None);
        };

        let json = match fs::read(&path).await {
            Ok(json) => json,
            Err(_) if !path.exists() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&json) {
            Ok(sidecar) => Ok(Some(sidecar)),
            Err(err) => {
                warn!("Ignoring unreadable metadata for {}: {}", key, err);
                Ok(None)
            }
        }
    }

    async fn load_head(&self, key: &str, path: &Path) -> Result<Option<ObjectHead>> {
        let file_meta = match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(_) if !path.exists() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if let Some(sidecar) = self.load_sidecar(key).await? {
            return Ok(Some(sidecar.into_head(key, file_meta.len())));
        }

        let etag = md5_file(path).await?;
        let uploaded = file_meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(
            Sidecar {
                version: etag.clone(),
                etag,
                uploaded,
                http_metadata: HttpMetadata::default(),
                custom_metadata: HashMap::new(),
            }
            .into_head(key, file_meta.len()),
        ))
    }

    /// Stores `data` under `key`, replacing any previous object.
    pub async fn put(
        &self,
        key: &str,
        data: &[u8],
        http_metadata: HttpMetadata,
        custom_metadata: HashMap<String, String>,
    ) -> Result<ObjectHead> {
        let (Some(path), Some(meta_path)) = (self.object_path(key), self.metadata_path(key)) else {
            return Err(Error::InvalidRequest(format!("invalid object key {:?}", key)));
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Some(parent) = meta_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, data).await?;

        let sidecar = Sidecar {
            version: Uuid::new_v4().simple().to_string(),
            etag: format!("{:x}", md5::compute(data)),
            uploaded: Utc::now(),
            http_metadata,
            custom_metadata,
        };
        fs::write(&meta_path, serde_json::to_vec(&sidecar)?).await?;

        info!("Stored object {} ({} bytes)", key, data.len());
        Ok(sidecar.into_head(key, data.len() as u64))
    }
}

#[async_trait]
impl ObjectStore for FileSystemStore {
    async fn list(&self, options: &ListOptions) -> Result<Listing> {
        let limit = options
            .limit
            .map_or(self.list_limit, |limit| limit.min(self.list_limit))
            .max(1);
        let after = options.cursor.as_deref().map(decode_cursor).transpose()?;
        let prefix = options.prefix.as_deref().unwrap_or("");
        let delimiter = options.delimiter.as_deref().filter(|d| !d.is_empty());

        let root = self.data_root();
        let keys = tokio::task::spawn_blocking(move || collect_keys(&root))
            .await
            .map_err(|err| anyhow!("listing task failed: {}", err))??;

        let page = paginate(&keys, prefix, delimiter, after.as_deref(), limit);
        debug!(
            "Listed {} objects and {} prefixes (truncated: {})",
            page.keys.len(),
            page.prefixes.len(),
            page.next.is_some()
        );

        let mut objects = Vec::with_capacity(page.keys.len());
        for key in &page.keys {
            let Some(path) = self.object_path(key) else {
                continue;
            };
            // Objects removed since the walk are simply skipped.
            if let Some(head) = self.load_head(key, &path).await? {
                objects.push(ListedObject::from_head(head, &options.include));
            }
        }

        Ok(Listing {
            objects,
            truncated: page.next.is_some(),
            cursor: page.next.as_deref().map(encode_cursor),
            delimited_prefixes: page.prefixes,
        })
    }

    async fn get(&self, key: &str, options: &GetOptions) -> Result<Option<StoredObject>> {
        let Some(path) = self.object_path(key) else {
            return Ok(None);
        };
        let Some(head) = self.load_head(key, &path).await? else {
            return Ok(None);
        };

        let conditional = Conditional::from_headers(&options.only_if);
        if !conditional.is_satisfied_by(&head) {
            debug!("Conditions not met for {}: {:?}", key, conditional);
            return Ok(Some(StoredObject { head, body: None }));
        }

        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(_) if !path.exists() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let body: ObjectBody = match options.range {
            Some(range) => {
                file.seek(SeekFrom::Start(range.offset.min(head.size))).await?;
                Box::new(file.take(range.length))
            }
            None => Box::new(file),
        };

        Ok(Some(StoredObject {
            head,
            body: Some(body),
        }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>> {
        match self.object_path(key) {
            Some(path) => self.load_head(key, &path).await,
            None => Ok(None),
        }
    }
}

// Keys are '/'-separated and must not escape the data directory
fn key_segments(key: &str) -> Option<Vec<&str>> {
    if key.is_empty() || key.starts_with('/') {
        return None;
    }

    let segments: Vec<&str> = key.split('/').collect();
    let unsafe_segment = |s: &&str| {
        s.is_empty() || *s == "." || *s == ".." || s.contains('\\') || s.contains('\0')
    };
    if segments.iter().any(unsafe_segment) {
        return None;
    }

    Some(segments)
}

async fn md5_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        context.consume(&buf[..read]);
    }

    Ok(format!("{:x}", context.compute()))
}

fn collect_keys(root: &Path) -> Result<Vec<String>> {
    let mut keys = Vec::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let segments: Option<Vec<&str>> = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect();

        match segments {
            Some(segments) => keys.push(segments.join("/")),
            None => warn!("Skipping non UTF-8 path {:?}", entry.path()),
        }
    }

    keys.sort();
    Ok(keys)
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Page {
    keys: Vec<String>,
    prefixes: Vec<String>,
    /// Last entry returned, set only when more entries follow it.
    next: Option<String>,
}

/// Selects one page of entries from `keys`, which must be sorted.
fn paginate(
    keys: &[String],
    prefix: &str,
    delimiter: Option<&str>,
    after: Option<&str>,
    limit: usize,
) -> Page {
    let mut page = Page::default();
    let mut last: Option<String> = None;

    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };

        if let Some(after) = after {
            if key.as_str() <= after {
                continue;
            }
            // A cursor that is a rolled-up prefix covers every key beneath it.
            let after_is_prefix = after.len() > prefix.len()
                && delimiter.is_some_and(|d| after.ends_with(d));
            if after_is_prefix && key.starts_with(after) {
                continue;
            }
        }

        let common = delimiter.and_then(|d| {
            rest.find(d)
                .map(|at| &key[..prefix.len() + at + d.len()])
        });
        if let Some(common) = common {
            if page.prefixes.last().map(String::as_str) == Some(common) {
                continue;
            }
        }

        if page.keys.len() + page.prefixes.len() == limit {
            page.next = last;
            break;
        }

        let entry = match common {
            Some(common) => {
                page.prefixes.push(common.to_string());
                common.to_string()
            }
            None => {
                page.keys.push(key.clone());
                key.clone()
            }
        };
        last = Some(entry);
    }

    page
}

fn encode_cursor(entry: &str) -> String {
    URL_SAFE_NO_PAD.encode(entry.as_bytes())
}

fn decode_cursor(cursor: &str) -> Result<String> {
    URL_SAFE_NO_PAD
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| Error::InvalidRequest(format!("invalid cursor {:?}", cursor)))
}

//! Object storage for uploaded profile images

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_EXTENSION: &str = "jpg";
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 11;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("storage request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Transport(e.to_string())
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path` without overwriting, returning the public URL
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Object path for an upload: `profiles/{millis}-{random}.{ext}`
pub fn upload_path(file_name: Option<&str>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!(
        "profiles/{}-{}.{}",
        Utc::now().timestamp_millis(),
        suffix,
        file_extension(file_name)
    )
}

/// Extension of the original file name, or `jpg` when missing or unusable
pub fn file_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Keeps uploads in memory and serves them under a fixed URL prefix
#[derive(Debug)]
pub struct MemoryObjectStorage {
    public_base: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStorage {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("memory://profile-images")
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let mut objects = self.objects.write();
        if objects.contains_key(path) {
            return Err(StorageError::Rejected {
                status: 409,
                message: format!("object {path} already exists"),
            });
        }
        objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.public_base, path))
    }
}

//! Image uploads to a Supabase storage bucket

use crate::object_storage::{ObjectStorage, StorageError};
use crate::supabase::SupabaseClient;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct SupabaseObjectStorage {
    client: SupabaseClient,
}

impl SupabaseObjectStorage {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseObjectStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        let response = self
            .client
            .post(&self.client.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Uploaded {} bytes to {}", size, path);
        Ok(self.client.public_object_url(path))
    }
}

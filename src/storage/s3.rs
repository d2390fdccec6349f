use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use tracing::info;

use super::ObjectStore;
use crate::error::{Error, Result};

/// Stores objects in an S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the ambient AWS configuration.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }
}

fn storage_err(action: &str, key: &str, err: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{action} '{key}' failed: {err}"))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket, local = %local_path.display()))]
    async fn upload(&self, local_path: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| storage_err("reading", &local_path.display().to_string(), e))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| storage_err("uploading", key, e))?;

        info!("Uploaded to S3");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket, local = %local_path.display()))]
    async fn download(&self, key: &str, local_path: &Path) -> Result<PathBuf> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_err("downloading", key, e))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| storage_err("reading body of", key, e))?
            .into_bytes();

        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, &data).await?;

        info!(bytes = data.len(), "Downloaded from S3");
        Ok(local_path.to_path_buf())
    }

    async fn put_bytes(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| storage_err("uploading", key, e))?;
        Ok(())
    }
}

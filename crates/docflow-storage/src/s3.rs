use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use docflow_core::StorageBackend;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let base = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&base);
        if let Some(ref endpoint) = endpoint_url {
            // S3-compatible providers usually need path-style addressing
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Ok(S3Storage {
            client,
            bucket,
            region,
            endpoint_url,
        })
    }

    fn validate_key(storage_key: &str) -> StorageResult<()> {
        if !keys::is_valid_key(storage_key) {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format:
    /// `https://{bucket}.s3.{region}.amazonaws.com/{key}`. For S3-compatible
    /// providers, path-style from the endpoint URL.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        processing_id: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<(String, String)> {
        let key = keys::document_key(processing_id, filename);
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", key, e)))?;

        tracing::debug!(key = %key, size, "Stored document in S3");

        let url = self.generate_url(&key);
        Ok((key, url))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        Self::validate_key(storage_key)?;

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    StorageError::NotFound(storage_key.to_string())
                } else {
                    StorageError::DownloadFailed(format!("{}: {}", storage_key, service_err))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("{}: {}", storage_key, e)))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        Self::validate_key(storage_key)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("{}: {}", storage_key, e)))?;
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Self::validate_key(storage_key)?;

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::BackendError(format!(
                        "{}: {}",
                        storage_key, service_err
                    )))
                }
            }
        }
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        Self::validate_key(storage_key)?;

        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    StorageError::NotFound(storage_key.to_string())
                } else {
                    StorageError::BackendError(format!("{}: {}", storage_key, service_err))
                }
            })?;

        Ok(output.content_length().unwrap_or(0) as u64)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

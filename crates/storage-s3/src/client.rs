//! AWS SDK S3 client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;

use acourse_storage::{
    CompletedUpload, MultipartSession, PartDescriptor, StorageClient, StorageError,
    StorageSettings,
};

use crate::error::sdk_error;

/// Provider name attached to statically configured credentials.
const STATIC_PROVIDER: &str = "acourse-static";

/// StorageClient implementation using AWS SDK for Rust.
///
/// One client is shared by every upload worker; the SDK client is
/// internally reference counted and pools its connections.
#[derive(Clone)]
pub struct S3StorageClient {
    /// The underlying S3 client.
    s3_client: S3Client,
}

impl S3StorageClient {
    /// Create a new client, using the default credential chain when the
    /// settings carry no static credentials.
    ///
    /// # Arguments
    /// * `settings` - Storage settings including region and optional credentials
    pub async fn new(settings: StorageSettings) -> Result<Self, StorageError> {
        if settings.credentials.is_some() {
            return Self::from_settings(&settings);
        }
        check_region(&settings.region)?;
        check_endpoint(settings.endpoint_url.as_deref())?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));
        if let Some(ref endpoint) = settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if settings.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }

        log::debug!("S3 client for region {} using default credential chain", settings.region);
        Ok(Self {
            s3_client: S3Client::from_conf(builder.build()),
        })
    }

    /// Create a client bound to a static access key pair and region.
    ///
    /// Fails with [`StorageError::Credential`] when either key is empty and
    /// with [`StorageError::Session`] when the region is empty.
    pub fn from_static_credentials(
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
    ) -> Result<Self, StorageError> {
        let settings =
            StorageSettings::with_static_credentials(region, access_key_id, secret_access_key);
        Self::from_settings(&settings)
    }

    /// Create a client from settings that carry static credentials.
    ///
    /// A custom `endpoint_url` switches to path-style addressing.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let creds = settings
            .credentials
            .as_ref()
            .ok_or_else(|| StorageError::Credential {
                message: "no static credentials configured".into(),
            })?;
        if creds.access_key_id.trim().is_empty() {
            return Err(StorageError::Credential {
                message: "access key id is empty".into(),
            });
        }
        if creds.secret_access_key.trim().is_empty() {
            return Err(StorageError::Credential {
                message: "secret access key is empty".into(),
            });
        }
        check_region(&settings.region)?;
        check_endpoint(settings.endpoint_url.as_deref())?;

        let credentials = Credentials::new(
            &creds.access_key_id,
            &creds.secret_access_key,
            creds.session_token.clone(),
            None,
            STATIC_PROVIDER,
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(ref endpoint) = settings.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        log::debug!(
            "S3 client for region {} with static key {}",
            settings.region,
            creds.access_key_id
        );
        Ok(Self {
            s3_client: S3Client::from_conf(builder.build()),
        })
    }

    /// Create a client from an existing S3Client.
    pub fn from_client(s3_client: S3Client) -> Self {
        Self { s3_client }
    }
}

fn check_region(region: &str) -> Result<(), StorageError> {
    if region.trim().is_empty() {
        return Err(StorageError::Session {
            message: "region is empty".into(),
        });
    }
    Ok(())
}

fn check_endpoint(endpoint: Option<&str>) -> Result<(), StorageError> {
    match endpoint {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            Err(StorageError::Session {
                message: format!("endpoint '{}' is not an http(s) URL", url),
            })
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<MultipartSession, StorageError> {
        let output = self
            .s3_client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|err| sdk_error(err, bucket, key))?;

        let upload_id = output.upload_id().ok_or_else(|| StorageError::Other {
            message: format!("CreateMultipartUpload for s3://{}/{} returned no upload id", bucket, key),
        })?;

        Ok(MultipartSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
        })
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: i32,
        data: Bytes,
    ) -> Result<String, StorageError> {
        let output = self
            .s3_client
            .upload_part()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .part_number(part_number)
            .content_length(data.len() as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| sdk_error(err, &session.bucket, &session.key))?;

        output
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| StorageError::Other {
                message: format!(
                    "UploadPart {} for s3://{}/{} returned no ETag",
                    part_number, session.bucket, session.key
                ),
            })
    }

    async fn complete_multipart_upload(
        &self,
        session: &MultipartSession,
        parts: &[PartDescriptor],
    ) -> Result<CompletedUpload, StorageError> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .set_e_tag(part.e_tag.clone())
                    .build()
            })
            .collect();

        let output = self
            .s3_client
            .complete_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|err| sdk_error(err, &session.bucket, &session.key))?;

        Ok(CompletedUpload {
            location: output.location().unwrap_or_default().to_string(),
            key: output.key().unwrap_or(&session.key).to_string(),
        })
    }

    async fn abort_multipart_upload(&self, session: &MultipartSession) -> Result<(), StorageError> {
        self.s3_client
            .abort_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .send()
            .await
            .map_err(|err| sdk_error(err, &session.bucket, &session.key))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.s3_client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| sdk_error(err, bucket, key))?;
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError> {
        match self.s3_client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(output.content_length().map(|l| l as u64)),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(StorageError::NetworkError {
                        message: service_err.to_string(),
                        retryable: false,
                    })
                }
            }
        }
    }
}

//! src/services/object_store.rs
//!
//! Object store client for attachments. Talks to any S3-compatible endpoint
//! (MinIO in development) through `aws-sdk-s3`. Every attachment lives in a
//! single bucket under its literal client-supplied name; writes to an
//! existing name overwrite it.

use crate::{
    config::ObjectStoreConfig,
    services::backoff::{RetryError, RetryPolicy, connect_with_retry},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream as S3ByteStream,
};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::{io, pin::Pin};
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// The single bucket holding every attachment.
pub const ATTACHMENT_BUCKET: &str = "image-storage";

/// Lazily produced object body.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// An object read back from the store.
pub struct StoredObject {
    /// Media type recorded at upload, if the uploader supplied one.
    pub content_type: Option<String>,
    pub body: ByteStream,
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object `{name}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, name: String },
    #[error("object store request failed: {0}")]
    Upstream(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Minimal S3 surface used by the service.
///
/// Failures after startup are surfaced as-is, never retried.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> ObjectStoreResult<bool>;

    async fn make_bucket(&self, bucket: &str) -> ObjectStoreResult<()>;

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> ObjectStoreResult<()>;

    /// Upload under the literal `name`, replacing any previous object and its
    /// recorded content type.
    async fn put_object(
        &self,
        bucket: &str,
        name: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()>;

    /// Stream an object back. `NotFound` when the name does not exist.
    async fn get_object(&self, bucket: &str, name: &str) -> ObjectStoreResult<StoredObject>;
}

/// What `ensure_bucket` found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketState {
    Existing,
    Created,
}

/// Create `bucket` if it is absent. Safe to call on every startup.
///
/// With `public_read` the policy is (re)applied on every call, whether or not
/// the bucket already existed. `PutBucketPolicy` replaces the document, so a
/// retried call after a failed policy write converges.
pub async fn ensure_bucket(
    store: &dyn ObjectStore,
    bucket: &str,
    public_read: bool,
) -> ObjectStoreResult<BucketState> {
    let state = if store.bucket_exists(bucket).await? {
        debug!("Bucket {} already exists", bucket);
        BucketState::Existing
    } else {
        store.make_bucket(bucket).await?;
        info!("Created bucket {}", bucket);
        BucketState::Created
    };

    if public_read {
        store
            .set_bucket_policy(bucket, &public_read_policy(bucket))
            .await?;
        info!("Applied public-read policy to bucket {}", bucket);
    }
    Ok(state)
}

/// Bucket policy allowing anonymous `s3:GetObject` on every object.
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Action": ["s3:GetObject"],
            "Effect": "Allow",
            "Principal": { "AWS": ["*"] },
            "Resource": [format!("arn:aws:s3:::{}/*", bucket)],
            "Sid": "",
        }],
    })
    .to_string()
}

/// `aws-sdk-s3` implementation of [`ObjectStore`].
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn new(cfg: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            cfg.access_key.clone(),
            cfg.secret_key.clone(),
            None,
            None,
            "note-board-static",
        );
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(&cfg.endpoint)
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }

    /// Build the client and retry until the attachment bucket is confirmed
    /// present (creating it when absent).
    pub async fn connect(
        cfg: &ObjectStoreConfig,
        policy: &RetryPolicy,
    ) -> Result<Self, RetryError<ObjectStoreError>> {
        let store = Self::new(cfg).await;
        connect_with_retry("MinIO", policy, || {
            ensure_bucket(&store, ATTACHMENT_BUCKET, cfg.public_read)
        })
        .await?;
        Ok(store)
    }
}

fn upstream<E>(err: E) -> ObjectStoreError
where
    E: std::error::Error,
{
    ObjectStoreError::Upstream(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> ObjectStoreResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|service| service.is_not_found());
                if not_found {
                    Ok(false)
                } else {
                    Err(upstream(err))
                }
            }
        }
    }

    async fn make_bucket(&self, bucket: &str) -> ObjectStoreResult<()> {
        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            // Lost a creation race against another instance.
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(err) => Err(upstream(err)),
        }
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> ObjectStoreResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(upstream)?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        name: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(name)
            .set_content_type(content_type.map(str::to_string))
            .body(S3ByteStream::from(bytes))
            .send()
            .await
            .map_err(upstream)?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, name: &str) -> ObjectStoreResult<StoredObject> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_no_such_key())
                {
                    ObjectStoreError::NotFound {
                        bucket: bucket.to_string(),
                        name: name.to_string(),
                    }
                } else {
                    upstream(err)
                }
            })?;

        let content_type = output.content_type;
        let reader = output.body.into_async_read();
        Ok(StoredObject {
            content_type,
            body: Box::pin(ReaderStream::new(reader).map_err(|err| {
                debug!("attachment stream interrupted: {}", err);
                err
            })),
        })
    }
}

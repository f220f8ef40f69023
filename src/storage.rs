//! Object storage for uploaded avatars (S3 API, MinIO in development).

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::AppConfig;

const REGION: &str = "us-east-1";
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    /// Publicly reachable URL of an uploaded object.
    fn public_url(&self, key: &str) -> String;
}

/// `<base>/<bucket>/<key>`; objects are addressed path-style.
pub fn object_url(public_base: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        public_base.trim_end_matches('/'),
        bucket,
        key.trim_start_matches('/')
    )
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_base: String,
}

impl Storage {
    pub async fn from_config(cfg: &AppConfig) -> Self {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(REGION))
            .credentials_provider(Credentials::new(
                &cfg.minio_access_key,
                &cfg.minio_secret_key,
                None,
                None,
                "static",
            ))
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.minio_endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(conf),
            bucket: cfg.minio_bucket.clone(),
            public_base: cfg.minio_public_url.clone(),
        }
    }

    /// Create the avatar bucket when it is missing. Startup keeps going on failure;
    /// uploads then fail individually and profile updates skip the avatar.
    pub async fn ensure_bucket(&self) {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return;
        }
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => info!(bucket = %self.bucket, "storage bucket created"),
            Err(e) => warn!(bucket = %self.bucket, error = %e, "storage bucket unavailable"),
        }
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size as i64)
            .cache_control(CACHE_CONTROL)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("upload {} to bucket {}", key, self.bucket))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        object_url(&self.public_base, &self.bucket, key)
    }
}

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

/// Object storage for meal photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String>;
}

/// S3-compatible bucket (path-style addressing, so MinIO works too).
#[derive(Clone)]
pub struct S3PhotoStore {
    client: Client,
    bucket: String,
}

impl S3PhotoStore {
    pub async fn new(cfg: &StorageConfig) -> Self {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        }
    }
}

#[async_trait]
impl PhotoStore for S3PhotoStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {key}"))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(std::time::Duration::from_secs(
                seconds,
            ))?)
            .await
            .with_context(|| format!("s3 presign {key}"))?;
        Ok(presigned.uri().to_string())
    }
}

/// File extension for the image types we accept.
pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Key prefix owned by one user. Meals may only reference photos under it.
pub fn user_prefix(user_id: uuid::Uuid) -> String {
    format!("photos/{user_id}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_image_types() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("text/plain"), None);
    }

    #[test]
    fn prefix_is_scoped_to_user() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(user_prefix(id), format!("photos/{id}/"));
    }
}

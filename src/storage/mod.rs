//! Room image storage on an S3-compatible object store.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;

/// A stored image: the object key (for later deletion) and the URL the
/// frontend loads it from.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub object_key: String,
    pub url: String,
}

pub struct ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    key_prefix: String,
    public_url_base: String,
}

impl ImageStore {
    /// Build the store from config. Returns None when no bucket is
    /// configured, in which case image endpoints report service unavailable.
    pub async fn from_config(config: &StorageConfig) -> Result<Option<Self>> {
        let Some(bucket) = config.bucket.clone() else {
            return Ok(None);
        };

        let base = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&base);
        if let Some(endpoint) = &config.endpoint {
            // Path-style addressing for MinIO and friends
            builder = builder.endpoint_url(endpoint.as_str()).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());

        let public_url_base = match &config.public_url_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => match &config.endpoint {
                Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
                None => format!("https://{}.s3.{}.amazonaws.com", bucket, config.region),
            },
        };

        info!(bucket = %bucket, "Image store configured");

        Ok(Some(Self {
            client,
            bucket,
            key_prefix: config.key_prefix.clone(),
            public_url_base,
        }))
    }

    /// Upload one image and return its key and public URL.
    pub async fn upload(
        &self,
        room_id: i64,
        filename: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<StoredImage> {
        let content_type = match content_type {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(filename)
                .first_or_octet_stream()
                .to_string(),
        };

        let object_key = format!(
            "{}/{}/{}-{}",
            self.key_prefix,
            room_id,
            Uuid::new_v4(),
            sanitize_filename(filename)
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .with_context(|| format!("Failed to upload image {object_key}"))?;

        let url = format!("{}/{}", self.public_url_base, object_key);
        Ok(StoredImage { object_key, url })
    }

    pub async fn delete(&self, object_key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
            .with_context(|| format!("Failed to delete image {object_key}"))?;
        Ok(())
    }
}

/// Keep object keys tame: alphanumerics, dot, dash and underscore only.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("room photo.jpg"), "room_photo.jpg");
        assert_eq!(sanitize_filename("déjà-vu.png"), "d_j_-vu.png");
        assert_eq!(sanitize_filename(""), "image");
        assert_eq!(sanitize_filename("ok-file_1.webp"), "ok-file_1.webp");
    }
}

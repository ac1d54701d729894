//! Object-store artifact fetcher.
//!
//! A pure request executor: given a scoped client, a key, and an open
//! sink, it streams the object body into the sink. Client construction is
//! behind a factory trait so the resource layer can be exercised without
//! network access.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::arn::Arn;
use crate::credentials::IamRoleCredentials;
use crate::error::{Error, Result};

/// Factory for object-store clients scoped to one bucket.
///
/// Credentials are bound per call and not retained.
pub trait S3ClientCreator: Send + Sync {
    /// Builds a client bound to `bucket` in `region` with `credentials`.
    fn client_for_bucket(
        &self,
        bucket: &str,
        region: &str,
        credentials: &IamRoleCredentials,
    ) -> Result<Arc<dyn ObjectStore>>;
}

/// Client creator backed by the AWS object-store implementation.
#[derive(Debug, Default)]
pub struct DefaultS3ClientCreator;

impl S3ClientCreator for DefaultS3ClientCreator {
    fn client_for_bucket(
        &self,
        bucket: &str,
        region: &str,
        credentials: &IamRoleCredentials,
    ) -> Result<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::new().with_bucket_name(bucket);

        if !region.is_empty() {
            builder = builder.with_region(region);
        }
        builder = builder
            .with_access_key_id(&credentials.access_key_id)
            .with_secret_access_key(&credentials.secret_access_key);
        if !credentials.session_token.is_empty() {
            builder = builder.with_token(&credentials.session_token);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(format!("unable to build s3 client: {e}")))?;
        Ok(Arc::new(client))
    }
}

/// Decomposes an object ARN's resource field into `(bucket, key)`.
pub fn parse_s3_arn(arn: &Arn) -> Result<(String, String)> {
    match arn.resource.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((bucket.to_string(), key.to_string()))
        }
        _ => Err(Error::InvalidS3Arn(arn.resource.clone())),
    }
}

/// Streams the object at `key` into `sink`.
///
/// The sink is an open file handle owned by the caller's atomic writer;
/// this function never opens or names files. The whole download is
/// bounded by `timeout`.
pub async fn download_object(
    client: Arc<dyn ObjectStore>,
    bucket: &str,
    key: &str,
    mut sink: tokio::fs::File,
    timeout: Duration,
) -> Result<()> {
    let path = object_store::path::Path::from(key);

    let download = async {
        let response = client
            .get(&path)
            .await
            .map_err(|e| map_object_store_error(e, bucket, key))?;

        let mut body = response.into_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| map_object_store_error(e, bucket, key))?;
            sink.write_all(&chunk).await?;
        }
        sink.flush().await?;
        Ok(())
    };

    match tokio::time::timeout(timeout, download).await {
        Ok(result) => {
            if result.is_ok() {
                debug!(bucket, key, "downloaded object");
            }
            result
        }
        Err(_) => Err(Error::Timeout {
            operation: format!("download s3://{bucket}/{key}"),
            duration: timeout,
        }),
    }
}

fn map_object_store_error(err: object_store::Error, bucket: &str, key: &str) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        object_store::Error::PermissionDenied { .. } | object_store::Error::Unauthenticated { .. } => {
            Error::AccessDenied(format!("s3://{bucket}/{key}"))
        }
        other => Error::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_arn() {
        let arn = Arn::parse("arn:aws:s3:::bucket/path/to/keyname.json").unwrap();
        let (bucket, key) = parse_s3_arn(&arn).unwrap();

        assert_eq!(bucket, "bucket");
        assert_eq!(key, "path/to/keyname.json");
    }

    #[test]
    fn test_parse_s3_arn_missing_key() {
        let arn = Arn::parse("arn:aws:s3:::bucket-only").unwrap();

        assert!(matches!(parse_s3_arn(&arn), Err(Error::InvalidS3Arn(_))));
    }
}

#![cfg(feature = "s3")]

use super::AsyncReadRange;
use aws_sdk_s3::{operation::get_object::builders::GetObjectFluentBuilder, Client};
use futures::future::BoxFuture;
use std::fmt;
use std::io::{Error, ErrorKind, Result};
use std::path::Path;
use tracing::debug;

pub struct S3Reader {
    request: GetObjectFluentBuilder,
}

impl S3Reader {
    pub fn new(client: Client, bucket: &str, key: &str) -> Self {
        let request = client.get_object().bucket(bucket).key(key);
        Self { request }
    }

    /// Build a reader from the default AWS environment. Unsigned access uses
    /// anonymous credentials, for public buckets.
    pub async fn connect(bucket: &str, key: &str, unsigned: bool) -> Self {
        let loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        let loader = if unsigned {
            loader.no_credentials()
        } else {
            loader
        };
        let sdk_config = loader.load().await;
        let client = Client::new(&sdk_config);
        Self::new(client, bucket, key)
    }

    pub fn from_request_builder(request: GetObjectFluentBuilder) -> Self {
        Self { request }
    }

    /// Probe for a sidecar object next to the key. Failures count as absent.
    pub async fn probe_sidecar(&self, suffix: &str) -> bool {
        let Some(key) = self.request.get_key().clone() else {
            return false;
        };
        let sidecar = format!("{key}.{suffix}");
        let request = self.request.clone().key(&sidecar).range("bytes=0-0");
        let found = request.send().await.is_ok();
        debug!("sidecar probe {sidecar}: {found}");
        found
    }

    /// Fetch the whole object into a local file.
    pub async fn download_to(&self, path: &Path) -> Result<()> {
        let response = self
            .request
            .clone()
            .send()
            .await
            .map_err(|e| Error::new(ErrorKind::NotConnected, format!("{e:?}")))?;
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| Error::new(ErrorKind::Interrupted, format!("{e:?}")))?
            .into_bytes();
        std::fs::write(path, &bytes)
    }
}

impl fmt::Debug for S3Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Reader")
            .field("bucket", &self.request.get_bucket().as_ref())
            .field("key", &self.request.get_key().as_ref())
            .finish()
    }
}

impl AsyncReadRange for S3Reader {
    fn read_range_async<'a>(&'a self, start: u64, buf: &'a mut [u8]) -> BoxFuture<'a, Result<usize>> {
        let n = buf.len();
        if n == 0 {
            return Box::pin(futures::future::ready(Ok(0)));
        }
        let end = start + n as u64 - 1; // GOTCHA byte range includes end
        let request_builder = self.request.clone().range(format!("bytes={start}-{end}"));

        Box::pin(async move {
            let request = request_builder.send();
            let mut response = request
                .await
                .map_err(|e| Error::new(ErrorKind::NotConnected, format!("{e:?}")))?;

            let mut pos = 0;
            while let Some(bytes) = response.body.try_next().await.map_err(|err| {
                Error::new(
                    ErrorKind::Interrupted,
                    format!("Failed to read from S3 download stream: {err:?}"),
                )
            })? {
                let take = bytes.len().min(n - pos);
                buf[pos..pos + take].copy_from_slice(&bytes[..take]);
                pos += take;
                if pos == n {
                    break;
                }
            }
            Ok(pos)
        })
    }
}

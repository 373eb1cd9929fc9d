use super::AsyncReadRange;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::RANGE;
use reqwest::{Client, IntoUrl, StatusCode, Url};
use std::io::{Error, ErrorKind, Result};
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct HttpReader {
    url: Url,
    client: Client,
}

impl HttpReader {
    pub fn new<U: IntoUrl>(url: U, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::other(format!("{e:?}")))?;
        Ok(Self {
            url: url
                .into_url()
                .map_err(|e| Error::new(ErrorKind::AddrNotAvailable, format!("{e:?}")))?,
            client,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// HEAD request for a sidecar next to the object, e.g. suffix "ovr" for
    /// "scene.tif" probes "scene.tif.ovr". Failures count as absent.
    pub async fn probe(&self, suffix: &str) -> bool {
        let path = format!("{}.{}", self.url.path(), suffix);
        let mut url = self.url.clone();
        url.set_path(&path);
        match self.client.head(url.clone()).send().await {
            Ok(response) => {
                let found = response.status().is_success();
                debug!("sidecar probe {url}: {found}");
                found
            }
            Err(e) => {
                debug!("sidecar probe {url} failed: {e:?}");
                false
            }
        }
    }
}

impl AsyncReadRange for HttpReader {
    fn read_range_async<'a>(
        &'a self,
        start: u64,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<usize>> {
        if buf.is_empty() {
            return futures::future::ready(Ok(0)).boxed();
        }
        let end = start + buf.len() as u64 - 1; // GOTCHA byte range includes end
        let request = self
            .client
            .get(self.url.clone())
            .header(RANGE, format!("bytes={start}-{end}"));

        async move {
            debug!("GET {} bytes={start}-{end}", self.url);
            let response = request
                .send()
                .await
                .map_err(|e| Error::new(ErrorKind::NotConnected, format!("{e:?}")))?;
            if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
                return Ok(0);
            }
            let response = response
                .error_for_status()
                .map_err(|e| Error::other(format!("{e:?}")))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::new(ErrorKind::InvalidData, format!("{e:?}")))?;
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            Ok(n)
        }
        .boxed()
    }
}

use crate::config::RemoteSettings;
use crate::error::BenchResult;
use crate::locator::Locator;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A downloaded object that lives only as long as its run. Dropping it
/// removes the temp file, so repeated benchmarks do not pile up in the
/// temp dir.
pub struct TempDownload(PathBuf);

impl TempDownload {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDownload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            debug!("failed to remove {:?}: {e:?}", self.0);
        }
    }
}

/// Materialize the whole object into a temp file for the local-download
/// strategy. A locator that is already a local path is copied, never
/// deleted in place.
pub async fn download_to_temp(
    locator: &Locator,
    settings: &RemoteSettings,
) -> BenchResult<TempDownload> {
    let path = std::env::temp_dir().join(format!(
        "cogbench-{}-{}",
        std::process::id(),
        locator.file_name()
    ));
    match locator {
        Locator::Http(url) => {
            // Connect timeout only: a full-object download of a large COG can
            // legitimately outlive the per-request timeout.
            let client = reqwest::Client::builder()
                .connect_timeout(settings.timeout)
                .build()
                .map_err(|e| Error::other(format!("{e:?}")))?;
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| Error::new(ErrorKind::NotConnected, format!("{e:?}")))?
                .error_for_status()
                .map_err(|e| Error::other(format!("{e:?}")))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::new(ErrorKind::Interrupted, format!("{e:?}")))?;
            std::fs::write(&path, &bytes)?;
        }
        #[cfg(feature = "s3")]
        Locator::S3 { bucket, key } => {
            let reader =
                crate::io::S3Reader::connect(bucket, key, settings.unsigned_requests).await;
            reader.download_to(&path).await?;
        }
        #[cfg(not(feature = "s3"))]
        Locator::S3 { .. } => {
            return Err(crate::error::BenchError::Usage(
                "this build does not include s3 support".to_string(),
            ))
        }
        Locator::File(local) => {
            std::fs::copy(local, &path)?;
        }
    }
    info!("downloaded {locator} to {path:?}");
    Ok(TempDownload(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_downloads_are_removed_on_drop() {
        let path = std::env::temp_dir().join(format!(
            "cogbench-download-drop-{}",
            std::process::id()
        ));
        std::fs::write(&path, b"tile bytes").unwrap();

        let temp = TempDownload(path.clone());
        assert!(temp.path().exists());
        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn local_objects_are_copied_not_moved() {
        let source = std::env::temp_dir().join(format!(
            "cogbench-download-source-{}.tif",
            std::process::id()
        ));
        std::fs::write(&source, b"tile bytes").unwrap();
        let locator = Locator::File(source.clone());

        let temp = futures::executor::block_on(download_to_temp(
            &locator,
            &RemoteSettings::default(),
        ))
        .unwrap();
        assert_ne!(temp.path(), source);
        assert_eq!(std::fs::read(temp.path()).unwrap(), b"tile bytes");

        let copied = temp.path().to_path_buf();
        drop(temp);
        assert!(!copied.exists());
        assert!(source.exists());

        std::fs::remove_file(&source).unwrap();
    }
}

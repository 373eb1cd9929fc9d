use crate::error::{BenchError, BenchResult};
use reqwest::Url;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the COG lives. Remote variants are read through range requests,
/// local files through positional reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Http(Url),
    S3 { bucket: String, key: String },
    File(PathBuf),
}

impl Locator {
    pub fn is_remote(&self) -> bool {
        !matches!(self, Locator::File(_))
    }

    /// Last path segment, used to name downloaded temp files.
    pub fn file_name(&self) -> String {
        let name = match self {
            Locator::Http(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string(),
            Locator::S3 { key, .. } => key.rsplit('/').next().unwrap_or_default().to_string(),
            Locator::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        if name.is_empty() {
            "object".to_string()
        } else {
            name
        }
    }
}

impl FromStr for Locator {
    type Err = BenchError;

    fn from_str(s: &str) -> BenchResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(BenchError::Usage("empty resource locator".to_string()));
        }
        if let Some(rest) = trimmed.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').ok_or_else(|| {
                BenchError::Usage(format!("s3 locator is missing an object key: {trimmed:?}"))
            })?;
            if bucket.is_empty() || key.is_empty() {
                return Err(BenchError::Usage(format!("bad s3 locator: {trimmed:?}")));
            }
            Ok(Locator::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed)
                .map_err(|e| BenchError::Usage(format!("bad url {trimmed:?}: {e}")))?;
            Ok(Locator::Http(url))
        } else if let Some(rest) = trimmed.strip_prefix("file://") {
            Ok(Locator::File(PathBuf::from(rest)))
        } else if trimmed.contains("://") {
            Err(BenchError::Usage(format!(
                "unsupported locator scheme: {trimmed:?}"
            )))
        } else {
            Ok(Locator::File(PathBuf::from(trimmed)))
        }
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Http(url) => write!(f, "{url}"),
            Locator::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            Locator::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_http_and_https() {
        let locator: Locator = "https://example.com/data/scene.tif".parse().unwrap();
        assert!(matches!(locator, Locator::Http(_)));
        assert!(locator.is_remote());
        assert_eq!(locator.file_name(), "scene.tif");
        assert!("http://example.com/a.tif".parse::<Locator>().is_ok());
    }

    #[test]
    fn parses_s3() {
        let locator: Locator = "s3://my-bucket/path/to/scene.tif".parse().unwrap();
        assert_eq!(
            locator,
            Locator::S3 {
                bucket: "my-bucket".to_string(),
                key: "path/to/scene.tif".to_string(),
            }
        );
        assert_eq!(locator.file_name(), "scene.tif");
    }

    #[test]
    fn parses_plain_paths_and_file_urls() {
        assert_eq!(
            "data/scene.tif".parse::<Locator>().unwrap(),
            Locator::File(PathBuf::from("data/scene.tif"))
        );
        assert_eq!(
            "file:///tmp/scene.tif".parse::<Locator>().unwrap(),
            Locator::File(PathBuf::from("/tmp/scene.tif"))
        );
        assert!(!"data/scene.tif".parse::<Locator>().unwrap().is_remote());
    }

    #[test]
    fn malformed_locators_are_usage_errors() {
        for bad in ["", "   ", "s3://bucket-only", "s3:///key", "gopher://x/y"] {
            let err = bad.parse::<Locator>().unwrap_err();
            assert!(matches!(err, BenchError::Usage(_)), "{bad:?}");
        }
    }
}

// Stateless range I/O
//   AsyncReadRange is a superset of AsyncRead + AsyncSeek with a key
//   difference: self is immutable. One reader can serve many concurrent
//   byte-range requests, which is exactly what COG tile access wants.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::io::{Error, ErrorKind, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub mod fs;
pub mod http;
pub mod s3;

pub use fs::FileReader;
pub use http::HttpReader;
#[cfg(feature = "s3")]
pub use s3::S3Reader;

pub trait AsyncReadRange: Send + Sync {
    /// Read bytes starting at a specific offset. May return fewer bytes than
    /// requested at the end of the resource; 0 means past the end.
    fn read_range_async<'a>(&'a self, start: u64, buf: &'a mut [u8])
        -> BoxFuture<'a, Result<usize>>;

    fn read_range_exact_async<'a>(
        &'a self,
        start: u64,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<()>> {
        let n = buf.len();
        async move {
            match self.read_range_async(start, buf).await {
                Ok(bytes_read) if bytes_read == n => Ok(()),
                Ok(bytes_read) => Err(Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("Failed to completely fill buffer: {bytes_read} < {n}"),
                )),
                Err(e) => Err(e),
            }
        }
        .boxed()
    }

    fn read_range_to_vec_async(&self, start: u64, end: u64) -> BoxFuture<'_, Result<Vec<u8>>> {
        let n = (end - start) as usize;
        async move {
            let mut buf = vec![0; n];
            self.read_range_exact_async(start, &mut buf).await?;
            Ok(buf)
        }
        .boxed()
    }
}

/// In-memory reader, mostly for tests.
#[derive(Clone, Debug)]
pub struct MemoryReader(pub Vec<u8>);

impl AsyncReadRange for MemoryReader {
    fn read_range_async<'a>(
        &'a self,
        start: u64,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<usize>> {
        let result = if start >= self.0.len() as u64 {
            Ok(0)
        } else {
            let start = start as usize;
            let n = buf.len().min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        };
        futures::future::ready(result).boxed()
    }
}

/// Requests and bytes fetched through an InstrumentedReader.
#[derive(Debug, Default)]
pub struct RangeStats {
    requests: AtomicU64,
    bytes: AtomicU64,
}

impl RangeStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransferStats {
        TransferStats {
            requests: self.requests.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub requests: u64,
    pub bytes: u64,
}

/// Wraps any range reader and counts its traffic.
pub struct InstrumentedReader {
    inner: Arc<dyn AsyncReadRange>,
    stats: Arc<RangeStats>,
}

impl InstrumentedReader {
    pub fn new(inner: Arc<dyn AsyncReadRange>, stats: Arc<RangeStats>) -> Self {
        Self { inner, stats }
    }
}

impl AsyncReadRange for InstrumentedReader {
    fn read_range_async<'a>(
        &'a self,
        start: u64,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<usize>> {
        self.stats.record_request();
        async move {
            let n = self.inner.read_range_async(start, buf).await?;
            self.stats.record_bytes(n as u64);
            Ok(n)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        futures::executor::block_on(future)
    }

    #[test]
    fn memory_reader_serves_ranges() {
        let reader = MemoryReader((0u8..100).collect());
        let bytes = block_on(reader.read_range_to_vec_async(10, 20)).unwrap();
        assert_eq!(bytes, (10u8..20).collect::<Vec<_>>());

        let mut buf = [0u8; 32];
        let n = block_on(reader.read_range_async(90, &mut buf)).unwrap();
        assert_eq!(n, 10);
        let n = block_on(reader.read_range_async(200, &mut buf)).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn short_reads_fail_exact_requests() {
        let reader = MemoryReader(vec![0; 16]);
        let mut buf = [0u8; 32];
        let err = block_on(reader.read_range_exact_async(0, &mut buf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn instrumented_reader_counts_traffic() {
        let stats = Arc::new(RangeStats::default());
        let reader = InstrumentedReader::new(
            Arc::new(MemoryReader(vec![7; 1024])),
            stats.clone(),
        );
        let _ = block_on(reader.read_range_to_vec_async(0, 100)).unwrap();
        let _ = block_on(reader.read_range_to_vec_async(100, 300)).unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.bytes, 300);
    }
}

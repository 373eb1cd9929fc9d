// cogbench
//   Compares access strategies for computing a band statistic from a
//   Cloud-Optimized GeoTIFF: download-then-read, naive remote reads, tuned
//   remote reads with coalesced ranges, and chunked concurrent reads.

pub mod cog;
pub mod config;
pub mod error;
pub mod io;
pub mod locator;
pub mod report;
pub mod runner;
pub mod sample;

pub use cog::Cog;
pub use config::{resolve, AccessMode, ConfigOption, RemoteSettings};
pub use error::{BenchError, BenchResult};
pub use io::{AsyncReadRange, FileReader, HttpReader, MemoryReader, TransferStats};
#[cfg(feature = "s3")]
pub use io::S3Reader;
pub use locator::Locator;
pub use report::BenchmarkReport;
pub use runner::{PendingMean, RunOutcome, StrategyRunner};
pub use sample::{Phase, TimingSample};

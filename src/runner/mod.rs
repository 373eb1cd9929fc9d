use crate::cog::Cog;
use crate::config::{self, AccessMode, RemoteSettings};
use crate::error::{BenchError, BenchResult};
use crate::io::{AsyncReadRange, FileReader, HttpReader, InstrumentedReader, RangeStats,
    TransferStats};
use crate::locator::Locator;
use crate::sample::{Phase, TimingSample};
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

mod chunked;
mod download;
mod plan;

pub use chunked::PendingMean;
pub use plan::{plan_fetches, FetchGroup, TileFetch};

/// What one successful strategy run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub mode: AccessMode,
    pub samples: Vec<TimingSample>,
    /// Spatial mean of band 0 at full resolution.
    pub mean: f64,
    pub pixels: u64,
    pub transfer: TransferStats,
}

/// Runs access strategies against a locator and keeps an append-only log of
/// timing samples across runs. A failed run contributes no samples; earlier
/// ones stay intact.
#[derive(Default)]
pub struct StrategyRunner {
    log: Vec<TimingSample>,
}

impl StrategyRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &[TimingSample] {
        &self.log
    }

    pub fn run(&mut self, locator: &Locator, mode: AccessMode) -> BenchResult<RunOutcome> {
        let options = config::resolve(mode);
        let settings = RemoteSettings::from_options(&options)?;
        debug!("resolved {mode} into {} options", options.len());

        let runtime = build_runtime(mode, &settings)?;
        let stats = Arc::new(RangeStats::default());

        // Open phase: configure access, resolve the COG index into an
        // in-memory handle. The chunked mode also constructs its deferred
        // reduction here so compute only ever measures materialization.
        let t_open = Instant::now();
        // Held for the whole run; dropping it removes the temp file
        let temp = match mode {
            AccessMode::LocalDownload => {
                Some(runtime.block_on(download::download_to_temp(locator, &settings))?)
            }
            _ => None,
        };
        let source = match &temp {
            Some(temp) => Locator::File(temp.path().to_path_buf()),
            None => locator.clone(),
        };
        let reader = runtime.block_on(make_reader(&source, &settings))?;
        let reader: Arc<dyn AsyncReadRange> =
            Arc::new(InstrumentedReader::new(reader, stats.clone()));
        if settings.probe_sidecars {
            runtime.block_on(probe_sidecars(locator, &settings));
        }
        let cog = runtime.block_on(Cog::open_from_range_reader(
            reader.as_ref(),
            settings.header_prefetch,
        ))?;
        let pending = match mode {
            AccessMode::RemoteChunked => Some(PendingMean::build(&cog, reader.clone(), &settings)),
            _ => None,
        };
        let open_sample = TimingSample::new(mode, Phase::Open, t_open.elapsed());
        info!(
            "{mode}: opened {locator} ({:.1} MP, {} levels) in {:.3}s",
            cog.full_megapixels(),
            cog.levels.len(),
            open_sample.duration.as_secs_f64()
        );

        // Compute phase: materialize the band mean.
        let t_compute = Instant::now();
        let (sum, count) = match pending {
            Some(pending) => pending.force(&runtime)?,
            None => sequential_sum(&runtime, reader.as_ref(), &cog, &settings)?,
        };
        let compute_sample = TimingSample::new(mode, Phase::Compute, t_compute.elapsed());

        if count == 0 {
            return Err(BenchError::RemoteAccess(Error::new(
                ErrorKind::InvalidData,
                "no samples materialized",
            )));
        }
        let mean = sum / count as f64;
        let transfer = stats.snapshot();
        info!(
            "{mode}: mean {mean:.4} over {count} pixels in {:.3}s ({} requests, {} bytes)",
            compute_sample.duration.as_secs_f64(),
            transfer.requests,
            transfer.bytes
        );

        self.log.push(open_sample.clone());
        self.log.push(compute_sample.clone());
        Ok(RunOutcome {
            mode,
            samples: vec![open_sample, compute_sample],
            mean,
            pixels: count,
            transfer,
        })
    }
}

fn build_runtime(mode: AccessMode, settings: &RemoteSettings) -> BenchResult<Runtime> {
    let runtime = match mode {
        // The worker pool belongs to the runtime; this tool only sizes it
        AccessMode::RemoteChunked => Builder::new_multi_thread()
            .worker_threads(settings.pool_size.max(1))
            .enable_all()
            .build(),
        _ => Builder::new_current_thread().enable_all().build(),
    };
    runtime.map_err(BenchError::from)
}

async fn make_reader(
    locator: &Locator,
    settings: &RemoteSettings,
) -> BenchResult<Arc<dyn AsyncReadRange>> {
    match locator {
        Locator::Http(url) => Ok(Arc::new(HttpReader::new(url.clone(), settings.timeout)?)),
        #[cfg(feature = "s3")]
        Locator::S3 { bucket, key } => Ok(Arc::new(
            crate::io::S3Reader::connect(bucket, key, settings.unsigned_requests).await,
        )),
        #[cfg(not(feature = "s3"))]
        Locator::S3 { .. } => Err(BenchError::Usage(
            "this build does not include s3 support".to_string(),
        )),
        Locator::File(path) => Ok(Arc::new(FileReader::new(path))),
    }
}

/// GDAL-style sidecar scans next to the object. Results are only logged; the
/// point of probing is its network cost, which the naive mode pays.
async fn probe_sidecars(locator: &Locator, settings: &RemoteSettings) {
    const SIDECAR_SUFFIXES: [&str; 3] = ["msk", "ovr", "aux.xml"];
    match locator {
        Locator::Http(url) => {
            if let Ok(reader) = HttpReader::new(url.clone(), settings.timeout) {
                for suffix in SIDECAR_SUFFIXES {
                    let _ = reader.probe(suffix).await;
                }
            }
        }
        #[cfg(feature = "s3")]
        Locator::S3 { bucket, key } => {
            let reader =
                crate::io::S3Reader::connect(bucket, key, settings.unsigned_requests).await;
            for suffix in SIDECAR_SUFFIXES {
                let _ = reader.probe_sidecar(suffix).await;
            }
        }
        #[cfg(not(feature = "s3"))]
        Locator::S3 { .. } => {}
        Locator::File(path) => {
            for suffix in SIDECAR_SUFFIXES {
                let sidecar = format!("{}.{suffix}", path.display());
                let found = std::path::Path::new(&sidecar).exists();
                debug!("sidecar probe {sidecar}: {found}");
            }
        }
    }
}

/// Fetch and reduce tile groups one request at a time.
fn sequential_sum(
    runtime: &Runtime,
    reader: &dyn AsyncReadRange,
    cog: &Cog,
    settings: &RemoteSettings,
) -> BenchResult<(f64, u64)> {
    let level = cog.level0();
    let groups = plan_fetches(level, settings.merge_gap, settings.max_request);
    debug!(
        "fetching {} ranges for {} tiles",
        groups.len(),
        level.tile_count()
    );

    let mut sum = 0.0;
    let mut count = 0u64;
    for group in groups {
        let bytes = runtime.block_on(reader.read_range_to_vec_async(group.start, group.end))?;
        for fetch in &group.tiles {
            let tile_bytes = &bytes[fetch.offset..fetch.offset + fetch.len];
            let (tile_sum, tile_count) = level.tile_band_sum(fetch.tile, tile_bytes)?;
            sum += tile_sum;
            count += tile_count;
        }
    }
    Ok((sum, count))
}

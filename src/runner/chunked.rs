// Chunked materialization
//   The deferred/parallel strategy: build() plans the fetch groups without
//   touching the network, force() fetches them concurrently on the runtime's
//   worker pool and decodes tiles in parallel on rayon. Timing the two calls
//   separately is what keeps deferred-graph construction out of the compute
//   measurement.

use super::plan::{plan_fetches, FetchGroup};
use crate::cog::Cog;
use crate::cog::Level;
use crate::config::RemoteSettings;
use crate::error::BenchResult;
use crate::io::AsyncReadRange;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// A band mean that has been planned but not yet materialized.
pub struct PendingMean {
    level: Level,
    reader: Arc<dyn AsyncReadRange>,
    groups: Vec<FetchGroup>,
}

impl PendingMean {
    pub fn build(cog: &Cog, reader: Arc<dyn AsyncReadRange>, settings: &RemoteSettings) -> Self {
        let level = cog.level0().clone();
        let groups = plan_fetches(&level, settings.merge_gap, settings.max_request);
        debug!(
            "planned {} chunk fetches for {} tiles",
            groups.len(),
            level.tile_count()
        );
        Self {
            level,
            reader,
            groups,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.groups.len()
    }

    /// Block until the reduction is materialized. Returns (sum, sample count).
    pub fn force(self, runtime: &Runtime) -> BenchResult<(f64, u64)> {
        let Self {
            level,
            reader,
            groups,
        } = self;

        // Concurrent chunk fetches (IO)
        let fetched: Vec<(FetchGroup, Vec<u8>)> = runtime.block_on(async move {
            let handles: Vec<_> = groups
                .into_iter()
                .map(|group| {
                    let reader = reader.clone();
                    tokio::spawn(async move {
                        let bytes = reader
                            .read_range_to_vec_async(group.start, group.end)
                            .await?;
                        Ok::<_, Error>((group, bytes))
                    })
                })
                .collect();

            let mut fetched = Vec::with_capacity(handles.len());
            for handle in handles {
                let joined = handle
                    .await
                    .map_err(|e| Error::new(ErrorKind::Interrupted, format!("{e:?}")))?;
                fetched.push(joined?);
            }
            Ok::<_, Error>(fetched)
        })?;

        // Parallel tile extraction and accumulation (decompression)
        let partials: Vec<BenchResult<(f64, u64)>> = fetched
            .into_par_iter()
            .map(|(group, bytes)| {
                let mut sum = 0.0;
                let mut count = 0u64;
                for fetch in &group.tiles {
                    let tile_bytes = &bytes[fetch.offset..fetch.offset + fetch.len];
                    let (tile_sum, tile_count) = level.tile_band_sum(fetch.tile, tile_bytes)?;
                    sum += tile_sum;
                    count += tile_count;
                }
                Ok((sum, count))
            })
            .collect();

        let mut sum = 0.0;
        let mut count = 0u64;
        for partial in partials {
            let (partial_sum, partial_count) = partial?;
            sum += partial_sum;
            count += partial_count;
        }
        Ok((sum, count))
    }
}

// Fetch planning
//   Tile byte ranges are sorted and neighbors coalesced into one request
//   when the dead bytes between them fit under the merge gap, the remote
//   equivalent of GDAL merging consecutive ranges. Groups never grow past
//   the max request size.

use crate::cog::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFetch {
    pub tile: usize,
    /// Byte offset of this tile within its group's fetched buffer.
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchGroup {
    pub start: u64,
    pub end: u64,
    pub tiles: Vec<TileFetch>,
}

impl FetchGroup {
    pub fn byte_len(&self) -> u64 {
        self.end - self.start
    }
}

/// Plan the range requests covering every tile of a level. A merge gap of 0
/// disables coalescing: one request per tile, in file order.
pub fn plan_fetches(level: &Level, merge_gap: u64, max_request: u64) -> Vec<FetchGroup> {
    let mut ranges: Vec<(usize, u64, u64)> = level
        .offsets
        .iter()
        .zip(level.byte_counts.iter())
        .enumerate()
        .filter(|(_, (_, count))| **count > 0) // sparse tiles hold no bytes
        .map(|(tile, (offset, count))| (tile, *offset, *offset + *count as u64))
        .collect();
    ranges.sort_by_key(|(_, start, _)| *start);

    let mut groups: Vec<FetchGroup> = Vec::new();
    for (tile, start, end) in ranges {
        let fetch = |group_start: u64| TileFetch {
            tile,
            offset: (start - group_start) as usize,
            len: (end - start) as usize,
        };
        match groups.last_mut() {
            Some(group)
                if merge_gap > 0
                    && start >= group.end
                    && start - group.end <= merge_gap
                    && end - group.start <= max_request =>
            {
                group.tiles.push(fetch(group.start));
                group.end = end;
            }
            _ => groups.push(FetchGroup {
                start,
                end,
                tiles: vec![fetch(start)],
            }),
        }
    }
    groups
}

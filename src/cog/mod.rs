use crate::io::AsyncReadRange;
use std::fmt::Display;
use std::io::{Cursor, Error, ErrorKind, Read, Seek};
use tracing::debug;

mod codec;
mod error;
mod index;
mod level;

pub use codec::{Compression, Predictor, SampleFormat};
pub use error::{CogError, CogResult};
pub use index::{Endian, Ifd, Tag, TagId, TagType, TiffIndex, TiffVariant};
pub use level::Level;

/// An indexed COG: overview levels sorted big to small, level 0 full
/// resolution. Holds no reader; tile bytes are fetched separately.
#[derive(Clone, Debug)]
pub struct Cog {
    pub levels: Vec<Level>,
}

impl Cog {
    pub fn open<R: Read + Seek>(source: &mut R) -> CogResult<Self> {
        let index = TiffIndex::parse(source)?;

        // Map IFDs into COG levels, skipping any that aren't valid levels
        let mut levels: Vec<Level> = index
            .ifds
            .iter()
            .filter_map(|ifd| Level::from_ifd(ifd, index.endian).ok())
            .collect();

        // COGs should already have levels sorted big to small
        levels.sort_by(|a, b| b.megapixels().total_cmp(&a.megapixels()));
        if levels.is_empty() {
            return Err(CogError::NoLevels);
        }

        Ok(Self { levels })
    }

    /// Open against a range reader: fetch the header region and grow it until
    /// the whole index parses. COG headers front-load the IFDs and tile
    /// offset arrays, so this usually resolves in one fetch.
    pub async fn open_from_range_reader(
        source: &dyn AsyncReadRange,
        prefetch: u64,
    ) -> CogResult<Self> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut fetch = prefetch.max(1024) as usize;
        for _ in 0..16 {
            let start = buffer.len() as u64;
            let mut bytes = vec![0; fetch];
            let n = source.read_range_async(start, &mut bytes).await?;
            buffer.extend_from_slice(&bytes[..n]);

            let mut cursor = Cursor::new(&buffer);
            match Self::open(&mut cursor) {
                Err(CogError::Read(e)) if e.kind() == ErrorKind::UnexpectedEof && n > 0 => {
                    debug!(
                        "tiff index incomplete after {} header bytes, fetching more",
                        buffer.len()
                    );
                    fetch *= 2;
                }
                result => return result,
            }
        }
        Err(CogError::Read(Error::new(
            ErrorKind::UnexpectedEof,
            "tiff index did not resolve within the header growth limit",
        )))
    }

    pub fn level0(&self) -> &Level {
        &self.levels[0]
    }

    pub fn full_dimensions(&self) -> (u32, u32) {
        self.levels[0].dimensions
    }

    pub fn full_megapixels(&self) -> f64 {
        self.levels[0].megapixels()
    }

    pub fn max_level(&self) -> usize {
        self.levels.len() - 1
    }
}

impl Display for Cog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cog({} Levels)", self.levels.len())?;
        for level in self.levels.iter() {
            write!(f, "\n  {level}")?;
        }
        Ok(())
    }
}

use super::codec::{Compression, Predictor, SampleFormat};
use super::error::{CogError, CogResult};
use super::index::{Endian, Ifd, TagId};
use std::fmt::Display;
use std::io::{Error, ErrorKind};

/// One tiled overview level of a COG.
#[derive(Clone, Debug)]
pub struct Level {
    pub dimensions: (u32, u32),
    pub tile_width: u32,
    pub tile_height: u32,
    pub compression: Compression,
    pub predictor: Predictor,
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub sample_format: SampleFormat,
    pub endian: Endian,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<usize>,
}

impl Level {
    pub fn from_ifd(ifd: &Ifd, endian: Endian) -> CogResult<Self> {
        // Required tags; strip TIFFs are not COG levels
        let width: u32 = ifd.value(TagId::ImageWidth)?;
        let height: u32 = ifd.value(TagId::ImageHeight)?;
        let tile_width = ifd.value(TagId::TileWidth).map_err(|_| CogError::NotTiled)?;
        let tile_height = ifd
            .value(TagId::TileLength)
            .map_err(|_| CogError::NotTiled)?;
        let offsets: Vec<u64> = ifd.values(TagId::TileOffsets)?;
        let byte_counts: Vec<usize> = ifd.values(TagId::TileByteCounts)?;
        if offsets.len() != byte_counts.len() {
            return Err(CogError::BadTag(TagId::TileOffsets));
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(CogError::BadTag(TagId::TileWidth));
        }
        // More offset entries than the tile grid holds is a malformed file,
        // not a bigger image
        let tile_cap =
            width.div_ceil(tile_width) as usize * height.div_ceil(tile_height) as usize;
        if offsets.len() > tile_cap {
            return Err(CogError::BadTag(TagId::TileOffsets));
        }

        // Optional tags with TIFF defaults
        let compression = ifd.value::<u16>(TagId::Compression).unwrap_or(1).into();
        let predictor = ifd.value::<u16>(TagId::Predictor).unwrap_or(1).into();
        let sample_format = ifd.value::<u16>(TagId::SampleFormat).unwrap_or(1).into();
        let bits: Vec<u16> = ifd
            .values(TagId::BitsPerSample)
            .unwrap_or_else(|_| vec![8]);
        let samples_per_pixel = ifd
            .value::<u16>(TagId::SamplesPerPixel)
            .unwrap_or(bits.len() as u16);

        // Layouts the band reduction cannot address
        let planar: u16 = ifd.value(TagId::PlanarConfiguration).unwrap_or(1);
        if planar != 1 {
            return Err(CogError::UnsupportedSampleLayout(format!(
                "planar configuration {planar}"
            )));
        }
        if bits.iter().any(|b| *b != bits[0]) {
            return Err(CogError::UnsupportedSampleLayout(format!(
                "mixed bit depths {bits:?}"
            )));
        }
        if bits[0] % 8 != 0 || bits[0] == 0 {
            return Err(CogError::UnsupportedSampleLayout(format!(
                "{}-bit samples",
                bits[0]
            )));
        }

        Ok(Self {
            dimensions: (width, height),
            tile_width,
            tile_height,
            compression,
            predictor,
            bits_per_sample: bits[0],
            samples_per_pixel,
            sample_format,
            endian,
            offsets,
            byte_counts,
        })
    }

    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    pub fn megapixels(&self) -> f64 {
        (self.dimensions.0 as f64 * self.dimensions.1 as f64) / 1e6
    }

    pub fn pixel_count(&self) -> u64 {
        self.dimensions.0 as u64 * self.dimensions.1 as u64
    }

    pub fn col_count(&self) -> usize {
        (self.width() as f64 / self.tile_width as f64).ceil() as usize
    }

    pub fn row_count(&self) -> usize {
        (self.height() as f64 / self.tile_height as f64).ceil() as usize
    }

    pub fn tile_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn tile_byte_range(&self, index: usize) -> CogResult<(u64, u64)> {
        let max_valid_index = self.offsets.len().min(self.byte_counts.len()) - 1;
        if index > max_valid_index {
            return Err(CogError::TileIndexOutOfRange((index, max_valid_index)));
        }
        let offset = self.offsets[index];
        Ok((offset, offset + self.byte_counts[index] as u64))
    }

    fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_sample() * self.samples_per_pixel as usize
    }

    /// Decompress one tile and undo its predictor. The result is the full
    /// padded tile, row-major, chunky layout.
    pub fn decode_tile(&self, bytes: &[u8]) -> CogResult<Vec<u8>> {
        let mut buffer = self.compression.decode(bytes)?;
        self.predictor.apply(
            &mut buffer,
            self.tile_width as usize,
            self.bits_per_sample as usize,
            self.samples_per_pixel as usize,
            self.endian,
        )?;
        let expected = self.tile_width as usize * self.tile_height as usize * self.bytes_per_pixel();
        if buffer.len() < expected {
            return Err(CogError::BadTileData(format!(
                "tile decoded to {} bytes, expected {expected}",
                buffer.len()
            )));
        }
        Ok(buffer)
    }

    /// Sum of band 0 over one tile, clipped to the image bounds so edge-tile
    /// padding never leaks into the reduction. Returns (sum, sample count).
    pub fn tile_band_sum(&self, index: usize, bytes: &[u8]) -> CogResult<(f64, u64)> {
        let data = self.decode_tile(bytes)?;

        let cols = self.col_count();
        let tile_cap = cols * self.row_count();
        if index >= tile_cap {
            return Err(CogError::TileIndexOutOfRange((
                index,
                tile_cap.saturating_sub(1),
            )));
        }
        let col = (index % cols) as u32;
        let row = (index / cols) as u32;
        let clip_width = self.tile_width.min(self.width() - col * self.tile_width);
        let clip_height = self.tile_height.min(self.height() - row * self.tile_height);

        let bytes_per_pixel = self.bytes_per_pixel();
        let bytes_per_sample = self.bytes_per_sample();
        let mut sum = 0.0;
        for y in 0..clip_height as usize {
            let row_at = y * self.tile_width as usize * bytes_per_pixel;
            for x in 0..clip_width as usize {
                let at = row_at + x * bytes_per_pixel;
                sum += self.sample_value(&data[at..at + bytes_per_sample])?;
            }
        }
        Ok((sum, clip_width as u64 * clip_height as u64))
    }

    fn sample_value(&self, raw: &[u8]) -> CogResult<f64> {
        let value = match (self.sample_format, self.bits_per_sample) {
            (SampleFormat::Unsigned, 8) => raw[0] as f64,
            (SampleFormat::Unsigned, 16) => self.endian.decode::<2, u16>(arr(raw)?)? as f64,
            (SampleFormat::Unsigned, 32) => self.endian.decode::<4, u32>(arr(raw)?)? as f64,
            (SampleFormat::Unsigned, 64) => self.endian.decode::<8, u64>(arr(raw)?)? as f64,
            (SampleFormat::Signed, 8) => raw[0] as i8 as f64,
            (SampleFormat::Signed, 16) => self.endian.decode::<2, i16>(arr(raw)?)? as f64,
            (SampleFormat::Signed, 32) => self.endian.decode::<4, i32>(arr(raw)?)? as f64,
            (SampleFormat::Signed, 64) => self.endian.decode::<8, i64>(arr(raw)?)? as f64,
            (SampleFormat::Float, 32) => self.endian.decode::<4, f32>(arr(raw)?)? as f64,
            (SampleFormat::Float, 64) => self.endian.decode::<8, f64>(arr(raw)?)?,
            (format, bits) => {
                return Err(CogError::UnsupportedSampleLayout(format!(
                    "{format:?} {bits}-bit samples"
                )))
            }
        };
        Ok(value)
    }
}

fn arr<const N: usize>(raw: &[u8]) -> CogResult<[u8; N]> {
    raw.try_into()
        .map_err(|_| CogError::Read(Error::new(ErrorKind::UnexpectedEof, "truncated sample")))
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Level({}x{}, {} tiles, {:?} Compression, {:?} Predictor)",
            self.dimensions.0,
            self.dimensions.1,
            self.offsets.len(),
            self.compression,
            self.predictor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cog::{Tag, TagType};

    fn test_level(width: u32, height: u32, tile: u32) -> Level {
        let cols = (width as usize).div_ceil(tile as usize);
        let rows = (height as usize).div_ceil(tile as usize);
        let tile_bytes = (tile * tile) as usize;
        Level {
            dimensions: (width, height),
            tile_width: tile,
            tile_height: tile,
            compression: Compression::Uncompressed,
            predictor: Predictor::No,
            bits_per_sample: 8,
            samples_per_pixel: 1,
            sample_format: SampleFormat::Unsigned,
            endian: Endian::Little,
            offsets: (0..cols * rows)
                .map(|i| 1000 + (i * tile_bytes) as u64)
                .collect(),
            byte_counts: vec![tile_bytes; cols * rows],
        }
    }

    #[test]
    fn tile_grid_dimensions() {
        let level = test_level(100, 80, 32);
        assert_eq!(level.col_count(), 4);
        assert_eq!(level.row_count(), 3);
        assert_eq!(level.tile_count(), 12);
        assert_eq!(level.pixel_count(), 8000);
    }

    #[test]
    fn tile_byte_ranges() {
        let level = test_level(64, 64, 32);
        assert_eq!(level.tile_byte_range(0).unwrap(), (1000, 2024));
        assert_eq!(level.tile_byte_range(3).unwrap(), (4072, 5096));
        assert!(matches!(
            level.tile_byte_range(4),
            Err(CogError::TileIndexOutOfRange((4, 3)))
        ));
    }

    #[test]
    fn band_sum_over_a_full_tile() {
        let level = test_level(64, 64, 32);
        let tile = vec![5u8; 32 * 32];
        let (sum, count) = level.tile_band_sum(0, &tile).unwrap();
        assert_eq!(count, 1024);
        assert_eq!(sum, 5.0 * 1024.0);
    }

    #[test]
    fn band_sum_clips_edge_tiles() {
        // 48x48 image on a 32-tile grid: tile 3 covers only 16x16 pixels
        let level = test_level(48, 48, 32);
        let tile = vec![3u8; 32 * 32];
        let (sum, count) = level.tile_band_sum(3, &tile).unwrap();
        assert_eq!(count, 256);
        assert_eq!(sum, 3.0 * 256.0);
        let (_, count) = level.tile_band_sum(1, &tile).unwrap();
        assert_eq!(count, 512);
    }

    #[test]
    fn float_samples_sum() {
        let mut level = test_level(32, 32, 32);
        level.bits_per_sample = 32;
        level.sample_format = SampleFormat::Float;
        let tile: Vec<u8> = std::iter::repeat(1.5f32)
            .take(32 * 32)
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let (sum, count) = level.tile_band_sum(0, &tile).unwrap();
        assert_eq!(count, 1024);
        assert!((sum - 1.5 * 1024.0).abs() < 1e-6);
    }

    #[test]
    fn tiles_past_the_grid_are_rejected() {
        // 32x32 on a 32-tile grid is a single tile; extra offset entries must
        // not drive the clip math past the image bounds
        let mut level = test_level(32, 32, 32);
        level.offsets = vec![1000, 2024, 3048];
        level.byte_counts = vec![1024; 3];
        let tile = vec![5u8; 32 * 32];
        assert!(matches!(
            level.tile_band_sum(2, &tile),
            Err(CogError::TileIndexOutOfRange((2, 0)))
        ));
        let (_, count) = level.tile_band_sum(0, &tile).unwrap();
        assert_eq!(count, 1024);
    }

    #[test]
    fn from_ifd_rejects_malformed_tile_grids() {
        fn long_tag(code: u16, values: &[u32]) -> Tag {
            let endian = Endian::Little;
            Tag {
                code,
                datatype: TagType::Long,
                count: values.len(),
                endian,
                data: values.iter().flat_map(|v| endian.encode(*v)).collect(),
            }
        }
        let tags = |tile: u32, entries: &[u32]| {
            Ifd(vec![
                long_tag(256, &[32]),
                long_tag(257, &[32]),
                long_tag(322, &[tile]),
                long_tag(323, &[tile]),
                long_tag(324, entries),
                long_tag(325, &vec![1024; entries.len()]),
            ])
        };

        // One tile fits the grid, three do not
        assert!(Level::from_ifd(&tags(32, &[1000]), Endian::Little).is_ok());
        assert!(matches!(
            Level::from_ifd(&tags(32, &[1000, 2024, 3048]), Endian::Little),
            Err(CogError::BadTag(TagId::TileOffsets))
        ));
        assert!(matches!(
            Level::from_ifd(&tags(0, &[1000]), Endian::Little),
            Err(CogError::BadTag(TagId::TileWidth))
        ));
    }

    #[test]
    fn short_tiles_are_rejected() {
        let level = test_level(64, 64, 32);
        let tile = vec![5u8; 100];
        assert!(matches!(
            level.tile_band_sum(0, &tile),
            Err(CogError::BadTileData(_))
        ));
    }
}

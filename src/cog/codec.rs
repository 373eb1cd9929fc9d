// Tile codecs
//   Decompression is delegated: flate2 for deflate, salzweg for TIFF-style
//   LZW. Anything else a COG might carry (JPEG, ZSTD, WebP, LERC) is reported
//   as unsupported rather than decoded.

use super::error::{CogError, CogResult};
use super::index::Endian;
use num_enum::{FromPrimitive, IntoPrimitive};
use salzweg::decoder::TiffStyleDecoder;
use std::io::Read;

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Compression {
    Uncompressed = 1,
    Lzw = 5,
    Jpeg = 7,
    DeflateAdobe = 8,
    PackBits = 32773,
    Lerc = 34887,
    Deflate = 32946,
    Zstd = 34926,
    WebP = 34927,

    #[num_enum(default)]
    Unknown = 0,
}

impl Compression {
    pub fn decode(&self, bytes: &[u8]) -> CogResult<Vec<u8>> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Lzw => TiffStyleDecoder::decode_to_vec(bytes)
                .map_err(|e| CogError::Decompress(format!("lzw: {e:?}"))),
            Self::DeflateAdobe | Self::Deflate => {
                let mut buf = vec![];
                flate2::read::ZlibDecoder::new(bytes)
                    .read_to_end(&mut buf)
                    .map_err(|e| CogError::Decompress(format!("deflate: {e:?}")))?;
                Ok(buf)
            }
            other => Err(CogError::UnsupportedCompression(*other)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Predictor {
    No = 1,
    Horizontal = 2,
    FloatingPoint = 3,

    #[num_enum(default)]
    Unknown = 0,
}

impl Predictor {
    pub fn apply(
        &self,
        buffer: &mut [u8],
        width: usize,
        bit_depth: usize,
        samples_per_pixel: usize,
        endian: Endian,
    ) -> CogResult<()> {
        match self {
            Self::No => {}
            Self::Horizontal if bit_depth == 8 => {
                let row_bytes = width * samples_per_pixel;
                for i in 0..buffer.len() {
                    if i % row_bytes < samples_per_pixel {
                        continue;
                    }
                    buffer[i] = buffer[i].wrapping_add(buffer[i - samples_per_pixel]);
                }
            }
            Self::Horizontal if bit_depth == 16 => {
                let row_bytes = width * samples_per_pixel * 2;
                for row in buffer.chunks_exact_mut(row_bytes) {
                    for i in samples_per_pixel..width * samples_per_pixel {
                        let at = i * 2;
                        let prev_at = (i - samples_per_pixel) * 2;
                        let prev: u16 = endian
                            .decode([row[prev_at], row[prev_at + 1]])
                            .unwrap_or_default();
                        let current: u16 =
                            endian.decode([row[at], row[at + 1]]).unwrap_or_default();
                        let decoded = endian.encode(current.wrapping_add(prev));
                        row[at] = decoded[0];
                        row[at + 1] = decoded[1];
                    }
                }
            }
            Self::Horizontal => {
                return Err(CogError::UnsupportedSampleLayout(format!(
                    "horizontal predictor with {bit_depth}-bit samples"
                )))
            }
            other => return Err(CogError::UnsupportedPredictor(*other)),
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum SampleFormat {
    Unsigned = 1,
    Signed = 2,
    Float = 3,

    #[num_enum(default)]
    Unknown = 0,
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn uncompressed_passes_through() {
        let bytes = vec![1, 2, 3, 4];
        assert_eq!(Compression::Uncompressed.decode(&bytes).unwrap(), bytes);
    }

    #[test]
    fn deflate_round_trips() {
        let original: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        let mut encoder = ZlibEncoder::new(vec![], flate2::Compression::default());
        encoder.write_all(&original).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(Compression::DeflateAdobe.decode(&compressed).unwrap(), original);
        assert_eq!(Compression::Deflate.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn unsupported_compression_is_reported() {
        let err = Compression::Jpeg.decode(&[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            CogError::UnsupportedCompression(Compression::Jpeg)
        ));
        assert_eq!(Compression::from(9999u16), Compression::Unknown);
    }

    #[test]
    fn horizontal_predictor_undoes_deltas() {
        // Row of deltas 10, +1, +1, +1 should reconstruct 10, 11, 12, 13
        let mut buffer = vec![10, 1, 1, 1, 20, 2, 2, 2];
        Predictor::Horizontal
            .apply(&mut buffer, 4, 8, 1, Endian::Little)
            .unwrap();
        assert_eq!(buffer, vec![10, 11, 12, 13, 20, 22, 24, 26]);
    }

    #[test]
    fn horizontal_predictor_16_bit() {
        let endian = Endian::Little;
        let values: Vec<u16> = vec![1000, 5, 5, 5];
        let mut buffer: Vec<u8> = values.iter().flat_map(|v| endian.encode(*v)).collect();
        Predictor::Horizontal
            .apply(&mut buffer, 4, 16, 1, endian)
            .unwrap();
        let decoded = endian.decode_all::<2, u16>(&buffer).unwrap();
        assert_eq!(decoded, vec![1000, 1005, 1010, 1015]);
    }

    #[test]
    fn float_predictor_is_unsupported() {
        let mut buffer = vec![0; 16];
        assert!(matches!(
            Predictor::FloatingPoint.apply(&mut buffer, 2, 32, 1, Endian::Little),
            Err(CogError::UnsupportedPredictor(Predictor::FloatingPoint))
        ));
    }
}

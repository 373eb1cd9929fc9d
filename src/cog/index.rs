// TIFF indexing, restricted to what tile access needs
//   A COG is a TIFF whose IFDs describe tiled overview levels. This walks the
//   header and IFD chain and keeps raw tag payloads around for typed reads.

use super::error::{CogError, CogResult};
use eio::{FromBytes, ReadExt, ToBytes};
use num_enum::{FromPrimitive, IntoPrimitive};
use num_traits::{NumCast, ToPrimitive};
use std::io::{self, Read, Seek, SeekFrom};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn read<const N: usize, T: FromBytes<N>>(&self, stream: &mut impl Read) -> io::Result<T> {
        let mut buf = [0u8; N];
        stream.read_exact(&mut buf)?;
        self.decode(buf)
    }

    pub fn decode<const N: usize, T: FromBytes<N>>(&self, bytes: [u8; N]) -> io::Result<T> {
        match self {
            Endian::Big => bytes.as_slice().read_be(),
            Endian::Little => bytes.as_slice().read_le(),
        }
    }

    pub fn decode_all<const N: usize, T: FromBytes<N>>(&self, bytes: &[u8]) -> Option<Vec<T>> {
        bytes
            .chunks_exact(N)
            .map(|chunk| {
                chunk
                    .try_into()
                    .ok()
                    .and_then(|arr| self.decode::<N, T>(arr).ok())
            })
            .collect()
    }

    pub fn encode<const N: usize, T: ToBytes<N>>(&self, value: T) -> [u8; N] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TiffVariant {
    Normal,
    Big,
}

impl TiffVariant {
    fn read_offset<R: Read>(&self, endian: Endian, stream: &mut R) -> io::Result<u64> {
        match self {
            TiffVariant::Normal => endian.read::<4, u32>(stream).map(|v| v as u64),
            TiffVariant::Big => endian.read(stream),
        }
    }

    const fn offset_bytesize(&self) -> usize {
        match self {
            TiffVariant::Normal => 4,
            TiffVariant::Big => 8,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum TagId {
    ImageWidth = 256,
    ImageHeight = 257,
    BitsPerSample = 258,
    Compression = 259,
    SamplesPerPixel = 277,
    PlanarConfiguration = 284,
    Predictor = 317,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SampleFormat = 339,

    #[num_enum(default)]
    Unknown = 0,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum TagType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
    Long8 = 16,
    SLong8 = 17,
    Ifd8 = 18,

    #[num_enum(default)]
    Unknown = 0,
}

impl TagType {
    fn size_in_bytes(&self) -> usize {
        match self {
            TagType::Byte | TagType::Ascii | TagType::SByte | TagType::Undefined => 1,
            TagType::Short | TagType::SShort => 2,
            TagType::Long | TagType::SLong | TagType::Float | TagType::Ifd => 4,
            TagType::Rational
            | TagType::SRational
            | TagType::Double
            | TagType::Long8
            | TagType::SLong8
            | TagType::Ifd8 => 8,
            TagType::Unknown => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Tag {
    pub code: u16,
    pub datatype: TagType,
    pub count: usize,
    pub endian: Endian,
    pub data: Vec<u8>,
}

impl Tag {
    pub fn value<T: NumCast + Copy>(&self) -> Option<T> {
        self.values().and_then(|values: Vec<T>| values.first().copied())
    }

    pub fn values<T: NumCast>(&self) -> Option<Vec<T>> {
        match self.datatype {
            TagType::Byte | TagType::Undefined | TagType::Ascii => {
                self.data.iter().map(|v| T::from(*v)).collect()
            }
            TagType::SByte => self.data.iter().map(|v| T::from(*v as i8)).collect(),
            TagType::Short => cast_all::<2, u16, T>(self.endian, &self.data),
            TagType::SShort => cast_all::<2, i16, T>(self.endian, &self.data),
            TagType::Long | TagType::Ifd => cast_all::<4, u32, T>(self.endian, &self.data),
            TagType::SLong => cast_all::<4, i32, T>(self.endian, &self.data),
            TagType::Float => cast_all::<4, f32, T>(self.endian, &self.data),
            TagType::Double => cast_all::<8, f64, T>(self.endian, &self.data),
            TagType::Long8 | TagType::Ifd8 => cast_all::<8, u64, T>(self.endian, &self.data),
            TagType::SLong8 => cast_all::<8, i64, T>(self.endian, &self.data),
            TagType::Rational | TagType::SRational | TagType::Unknown => None,
        }
    }
}

fn cast_all<const N: usize, A: FromBytes<N> + ToPrimitive, T: NumCast>(
    endian: Endian,
    data: &[u8],
) -> Option<Vec<T>> {
    endian
        .decode_all::<N, A>(data)?
        .into_iter()
        .map(|v| T::from(v))
        .collect()
}

#[derive(Clone, Debug)]
pub struct Ifd(pub Vec<Tag>);

impl Ifd {
    pub fn parse<R: Read + Seek>(
        stream: &mut R,
        offset: u64,
        endian: Endian,
        variant: TiffVariant,
    ) -> io::Result<(Ifd, u64)> {
        stream.seek(SeekFrom::Start(offset))?;

        // IFD header is just the number of tags
        let tag_count = match variant {
            TiffVariant::Normal => endian.read::<2, u16>(stream)? as u64,
            TiffVariant::Big => endian.read(stream)?,
        };

        let offset_size = variant.offset_bytesize();
        let mut tags = Vec::with_capacity(tag_count as usize);
        for _ in 0..tag_count {
            let code = endian.read(stream)?;
            let datatype: TagType = endian.read::<2, u16>(stream)?.into();
            let count = variant.read_offset(endian, stream)? as usize;

            let data_size = count * datatype.size_in_bytes();
            let mut data: Vec<u8> = vec![0; data_size];
            if data_size > offset_size {
                // Payload lives elsewhere in the file
                let data_offset = variant.read_offset(endian, stream)?;
                let pos = stream.stream_position()?;
                stream.seek(SeekFrom::Start(data_offset))?;
                stream.read_exact(&mut data)?;
                stream.seek(SeekFrom::Start(pos))?;
            } else {
                // Payload is inline, left-justified in the offset field
                let mut field = vec![0; offset_size];
                stream.read_exact(&mut field)?;
                data.copy_from_slice(&field[..data_size]);
            }

            tags.push(Tag {
                code,
                datatype,
                count,
                endian,
                data,
            });
        }

        let next_ifd_offset = variant.read_offset(endian, stream)?;
        Ok((Ifd(tags), next_ifd_offset))
    }

    pub fn tag(&self, id: TagId) -> CogResult<&Tag> {
        let code: u16 = id.into();
        let Self(tags) = &self;
        tags.iter()
            .find(|tag| tag.code == code)
            .ok_or(CogError::MissingTag(id))
    }

    pub fn value<T: NumCast + Copy>(&self, id: TagId) -> CogResult<T> {
        self.tag(id)?.value().ok_or(CogError::BadTag(id))
    }

    pub fn values<T: NumCast>(&self, id: TagId) -> CogResult<Vec<T>> {
        self.tag(id)?.values().ok_or(CogError::BadTag(id))
    }
}

#[derive(Clone, Debug)]
pub struct TiffIndex {
    pub endian: Endian,
    pub variant: TiffVariant,
    pub ifds: Vec<Ifd>,
}

impl TiffIndex {
    pub fn parse<R: Read + Seek>(stream: &mut R) -> CogResult<Self> {
        let mut buf = [0; 4];
        stream.seek(SeekFrom::Start(0))?;
        stream.read_exact(&mut buf)?;

        let endian = match &buf[..2] {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => return Err(CogError::BadMagicBytes),
        };

        let variant = match &buf[2..4] {
            b"\0*" | b"*\0" => TiffVariant::Normal,
            b"\0+" | b"+\0" => TiffVariant::Big,
            _ => return Err(CogError::BadMagicBytes),
        };

        if TiffVariant::Big == variant {
            // BigTIFFs have 4 extra bytes in the header
            let _offset_bytesize: u16 = endian.read(stream)?; // 0x0008
            let _: u16 = endian.read(stream)?; // 0x0000
        }

        let mut ifds = vec![];
        let mut ifd_offset = variant.read_offset(endian, stream)?;
        while ifd_offset != 0 && ifds.len() < 256 {
            let (ifd, next_offset) = Ifd::parse(stream, ifd_offset, endian, variant)?;
            ifd_offset = next_offset;
            ifds.push(ifd);
        }

        Ok(Self {
            endian,
            variant,
            ifds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_bad_magic_bytes() {
        let mut stream = Cursor::new(b"PNG\0....".to_vec());
        assert!(matches!(
            TiffIndex::parse(&mut stream),
            Err(CogError::BadMagicBytes)
        ));
    }

    #[test]
    fn truncated_header_is_a_read_error() {
        let mut stream = Cursor::new(b"II*\0\x08\0\0\0".to_vec());
        match TiffIndex::parse(&mut stream) {
            Err(CogError::Read(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn inline_short_values_decode() {
        let tag = Tag {
            code: 256,
            datatype: TagType::Short,
            count: 1,
            endian: Endian::Little,
            data: vec![64, 0],
        };
        assert_eq!(tag.value::<u32>(), Some(64));
        let tag = Tag {
            code: 256,
            datatype: TagType::Short,
            count: 1,
            endian: Endian::Big,
            data: vec![0, 64],
        };
        assert_eq!(tag.value::<u32>(), Some(64));
    }

    #[test]
    fn long_arrays_decode() {
        let endian = Endian::Little;
        let data: Vec<u8> = [100u32, 200, 300]
            .iter()
            .flat_map(|v| endian.encode(*v))
            .collect();
        let tag = Tag {
            code: 324,
            datatype: TagType::Long,
            count: 3,
            endian,
            data,
        };
        assert_eq!(tag.values::<u64>(), Some(vec![100, 200, 300]));
    }
}

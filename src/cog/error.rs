use super::codec::{Compression, Predictor};
use super::index::TagId;
use std::fmt;
use std::io;

pub type CogResult<T> = Result<T, CogError>;

#[derive(Debug)]
pub enum CogError {
    BadMagicBytes,
    MissingTag(TagId),
    BadTag(TagId),
    NotTiled,
    NoLevels,
    TileIndexOutOfRange((usize, usize)),
    UnsupportedCompression(Compression),
    UnsupportedPredictor(Predictor),
    UnsupportedSampleLayout(String),
    Decompress(String),
    BadTileData(String),
    Read(io::Error),
}

impl fmt::Display for CogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for CogError {}

impl From<io::Error> for CogError {
    fn from(e: io::Error) -> Self {
        CogError::Read(e)
    }
}

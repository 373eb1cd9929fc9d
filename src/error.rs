use crate::cog::CogError;
use std::fmt;
use std::io;

pub type BenchResult<T> = Result<T, BenchError>;

#[derive(Debug)]
pub enum BenchError {
    /// Unknown access mode or a bad option value.
    Configuration(String),
    /// Network, auth or decoding failure, surfaced unchanged.
    RemoteAccess(io::Error),
    /// Malformed resource locator or unusable invocation.
    Usage(String),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for BenchError {}

impl From<io::Error> for BenchError {
    fn from(e: io::Error) -> Self {
        BenchError::RemoteAccess(e)
    }
}

impl From<CogError> for BenchError {
    fn from(e: CogError) -> Self {
        match e {
            CogError::Read(io_error) => BenchError::RemoteAccess(io_error),
            cog_error => BenchError::RemoteAccess(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{cog_error:?}"),
            )),
        }
    }
}

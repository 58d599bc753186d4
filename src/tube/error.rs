//! Error types for tube file storage.

use core::fmt;
use std::error::Error;
use std::io;
use std::path::PathBuf;

/// Errors which can occur when writing or reading a tube file.
#[derive(Debug)]
pub enum TubeFileError {
    /// The underlying read or write failed.
    Io(IoFailure),
    /// The file content (or the tube to be written) does not fit the format.
    WrongFormat(WrongFormat),
}

impl fmt::Display for TubeFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TubeFileError::Io(inner) => inner.fmt(f),
            TubeFileError::WrongFormat(inner) => inner.fmt(f),
        }
    }
}

impl Error for TubeFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TubeFileError::Io(inner) => Some(&inner.source),
            TubeFileError::WrongFormat(_) => None,
        }
    }
}

impl From<IoFailure> for TubeFileError {
    fn from(from: IoFailure) -> Self {
        TubeFileError::Io(from)
    }
}

impl From<WrongFormat> for TubeFileError {
    fn from(from: WrongFormat) -> Self {
        TubeFileError::WrongFormat(from)
    }
}

/// An io error together with the path it happened on.
#[derive(Debug)]
pub struct IoFailure {
    pub(crate) path: PathBuf,
    pub(crate) source: io::Error,
}

impl fmt::Display for IoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io error on {}: {}", self.path.display(), self.source)
    }
}

impl Error for IoFailure {}

/// A format violation together with the path and what was wrong.
#[derive(Debug)]
pub struct WrongFormat {
    pub(crate) path: PathBuf,
    pub(crate) detail: String,
}

impl fmt::Display for WrongFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a valid tube file: {}", self.path.display(), self.detail)
    }
}

impl Error for WrongFormat {}

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur while decoding a container or writing its groups.
///
/// Every variant except [`Error::Resource`] aborts an extraction run. A
/// `Resource` error only affects the group whose output could not be created.
#[derive(Debug, Error)]
pub enum Error {
    /// Premature end of data while reading the input.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// A segment header carried a different id than the one required here.
    #[error("invalid segment id: expected {expected}, found {found:?}")]
    InvalidSegmentId {
        expected: &'static str,
        found: String,
    },
    /// The directory segment lists no sub-blocks.
    #[error("directory contains no entries")]
    EmptyDirectory,
    /// The directory segment is malformed.
    #[error("invalid directory: {0}")]
    InvalidDirectory(&'static str),
    /// A dimension descriptor violates the container rules.
    #[error("invalid dimension: {0}")]
    InvalidDimension(&'static str),
    /// A dimension identifier starts with a byte outside the ASCII range.
    #[error("invalid axis key: 0x{0:02X}")]
    InvalidAxisKey(u8),
    /// Unrecognized pixel type code.
    #[error("invalid pixel type code: {0}")]
    InvalidPixelType(i32),
    /// Members of one group disagree on their pixel type.
    #[error("group {group} mixes pixel types {first} and {other}")]
    MixedPixelTypes { group: u64, first: i32, other: i32 },
    /// Sub-block payload uses a compression scheme.
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(i32),
    /// A partitioning axis carries a negative start coordinate.
    #[error("sub-block {entry} has negative start {start} on axis {axis}")]
    NegativeAxisStart { entry: usize, axis: char, start: i32 },
    /// A negative start coordinate produced a negative composite group index.
    #[error("sub-block {entry} maps to negative group index {index}")]
    NegativeGroupIndex { entry: usize, index: i64 },
    /// The product of axis extents does not fit in 64 bits.
    #[error("group count overflows")]
    GroupCountOverflow,
    /// The reconstructed buffer size does not fit in memory addressing.
    #[error("output buffer too large: {0:?} pixels")]
    BufferTooLarge([usize; 3]),
    /// A copy region falls outside its source or destination extent.
    #[error("region out of bounds: offset {offset:?} size {size:?} in extent {extent:?}")]
    RegionOutOfBounds {
        offset: [i64; 3],
        size: [usize; 3],
        extent: [usize; 3],
    },
    /// A payload holds fewer bytes than its placement covers.
    #[error("payload of sub-block {entry} has {actual} bytes, expected {expected}")]
    PayloadSizeMismatch {
        entry: usize,
        expected: usize,
        actual: usize,
    },
    /// Plane streaming was requested for a group with sub-tiled planes.
    #[error("sub-block {entry} does not cover a full XY plane")]
    IncompatibleLayout { entry: usize },
    /// An output artifact for one group could not be created or written.
    #[error("cannot write '{}': {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if processing may continue with the next group.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Resource { .. })
    }

    /// Maps a failed `read_exact` to [`Error::UnexpectedEof`] when the input
    /// simply ran out, keeping other I/O failures intact.
    pub(crate) fn from_read(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

//! Error types for walking an archive.

use thiserror::Error;

use crate::header::HeaderError;

/// Errors that abort a walk.
///
/// Every variant carries the byte offset of the block (or header) where the
/// problem was found. None of them are recoverable: the walker has no way
/// to find the next header once the framing is lost.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The stream ended partway through a block.
    #[error("truncated block at offset {offset}: only {read} of 512 bytes")]
    TruncatedRead {
        /// Offset of the truncated block.
        offset: u64,
        /// Bytes of the block that were available.
        read: usize,
    },

    /// I/O error from the underlying reader.
    #[error("I/O error reading block at offset {offset}")]
    Io {
        /// Offset of the block being read.
        offset: u64,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A GNU long name header declares an unusable size.
    #[error("invalid long name size at offset {offset}: {size:?} (limit {limit})")]
    MalformedLongNameSize {
        /// Offset of the long name header.
        offset: u64,
        /// The decoded size, if it could be decoded at all.
        size: Option<u64>,
        /// Configured limit.
        limit: u64,
    },

    /// A regular header's size field can't be decoded.
    #[error("invalid size for {:?} at offset {offset}", String::from_utf8_lossy(.name))]
    MalformedEntrySize {
        /// Offset of the header.
        offset: u64,
        /// Resolved name of the entry.
        name: Vec<u8>,
        /// Decoding error.
        #[source]
        source: HeaderError,
    },

    /// The stream ended before all the long name data was read.
    #[error("truncated long name data for header at offset {offset}")]
    TruncatedLongNameData {
        /// Offset of the long name header.
        offset: u64,
    },

    /// Couldn't move past an entry's data region.
    #[error("cannot skip {skip} bytes of data at offset {offset}")]
    SeekFailure {
        /// Offset of the data region.
        offset: u64,
        /// Number of bytes to skip.
        skip: u64,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The stream ended where the header a GNU long name applies to should be.
    #[error("long name at offset {offset} has no following entry")]
    OrphanedLongName {
        /// Offset of the long name header.
        offset: u64,
    },

    /// The stream ended without the end-of-archive marker.
    #[error("archive ends at offset {offset} without an end-of-archive marker")]
    MissingEndMarker {
        /// Offset where the stream ended.
        offset: u64,
    },

    /// A header failed checksum verification.
    #[error("bad header at offset {offset}")]
    ChecksumMismatch {
        /// Offset of the header.
        offset: u64,
        /// Checksum error.
        #[source]
        source: HeaderError,
    },
}

impl WalkError {
    /// The byte offset at which the error occurred.
    #[must_use]
    pub fn offset(&self) -> u64 {
        match *self {
            WalkError::TruncatedRead { offset, .. }
            | WalkError::Io { offset, .. }
            | WalkError::MalformedLongNameSize { offset, .. }
            | WalkError::MalformedEntrySize { offset, .. }
            | WalkError::TruncatedLongNameData { offset }
            | WalkError::SeekFailure { offset, .. }
            | WalkError::OrphanedLongName { offset }
            | WalkError::MissingEndMarker { offset }
            | WalkError::ChecksumMismatch { offset, .. } => offset,
        }
    }
}

/// Result type for walking an archive.
pub type Result<T> = std::result::Result<T, WalkError>;

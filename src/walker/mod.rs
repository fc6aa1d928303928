//! Walking a tar archive header by header, without reading entry data.
//!
//! The [`ArchiveWalker`] reads one 512-byte block at a time and hands it to
//! a [`Cursor`], which decides what the block is: a header, GNU long name
//! data, or part of the end-of-archive marker. For every entry it yields an
//! [`EntryRecord`] with the entry's resolved name, the offset of its data and
//! its declared size, then seeks past the data region.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use tarindex::walker::{ArchiveWalker, WalkerConfig};
//!
//! let file = File::open("archive.tar").unwrap();
//! let mut walker = ArchiveWalker::new(BufReader::new(file), WalkerConfig::default());
//!
//! while let Some(record) = walker.next_entry().unwrap() {
//!     println!("{} at {} ({} bytes)", record.name_lossy(), record.data_offset, record.size);
//! }
//! ```
//!
//! Streams that can't seek (pipes, stdin) can be wrapped in
//! [`ForwardOnly`](crate::util::ForwardOnly).

mod config;
mod cursor;
mod entry;
mod error;

use std::io::{self, Read, Seek};
use std::iter::FusedIterator;

use log::{debug, trace};

use crate::header::{Block, BLOCK_SIZE};
use crate::util::{read_block, BlockRead};

pub use config::{WalkerConfig, DEFAULT_MAX_LONG_NAME_LEN};
pub use cursor::{Cursor, Step};
pub use entry::EntryRecord;
pub use error::{Result, WalkError};

/// Walks the headers of a tar archive.
///
/// The walker owns its stream for the duration of the walk. Once it has
/// returned an error or reached the end of the archive, it yields nothing
/// more.
#[derive(Debug)]
pub struct ArchiveWalker<R> {
    reader: R,
    cursor: Cursor,
    block: Block,
    /// Data bytes of the last entry that still have to be skipped
    pending_skip: u64,
    done: bool,
}

impl<R: Read + Seek> ArchiveWalker<R> {
    /// Create a walker over a stream positioned at the start of an archive.
    pub fn new(reader: R, config: WalkerConfig) -> Self {
        Self {
            reader,
            cursor: Cursor::new(config),
            block: [0u8; BLOCK_SIZE],
            pending_skip: 0,
            done: false,
        }
    }

    /// Create a walker with the default configuration.
    pub fn with_defaults(reader: R) -> Self {
        Self::new(reader, WalkerConfig::default())
    }

    /// Bytes of the archive accounted for so far, including the data region
    /// of the last entry returned.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.cursor.offset()
    }

    #[must_use]
    pub fn config(&self) -> &WalkerConfig {
        self.cursor.config()
    }

    /// Get the next entry.
    ///
    /// Returns `Ok(None)` at the end of the archive. The data region of the
    /// previous entry is skipped first, so a failure to skip it is reported
    /// here, after that entry has already been returned.
    pub fn next_entry(&mut self) -> Result<Option<EntryRecord>> {
        if self.done {
            return Ok(None);
        }

        let result = self.advance();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    /// Consume the walker and return the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn advance(&mut self) -> Result<Option<EntryRecord>> {
        self.skip_data()?;

        loop {
            let offset = self.cursor.offset();
            match read_block(&mut self.reader, &mut self.block) {
                Ok(BlockRead::Full) => {}
                Ok(BlockRead::EndOfStream) => {
                    self.cursor.finish()?;
                    return Ok(None);
                }
                Ok(BlockRead::Truncated(read)) => return Err(self.cursor.truncated(read)),
                Err(source) => return Err(WalkError::Io { offset, source }),
            }
            trace!("block at offset {offset}");

            match self.cursor.step(&self.block)? {
                Step::Continue => {}
                Step::End => {
                    debug!("end-of-archive marker at offset {offset}");
                    return Ok(None);
                }
                Step::Entry { record, skip } => {
                    debug!(
                        "{:?} entry {:?} at offset {}, {} bytes",
                        record.entry_type,
                        record.name_lossy(),
                        record.data_offset,
                        record.size
                    );
                    self.pending_skip = skip;
                    return Ok(Some(record));
                }
            }
        }
    }

    fn skip_data(&mut self) -> Result<()> {
        let skip = std::mem::take(&mut self.pending_skip);
        if skip == 0 {
            return Ok(());
        }

        let offset = self.cursor.offset() - skip;
        i64::try_from(skip)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "skip too large"))
            .and_then(|distance| self.reader.seek_relative(distance))
            .map_err(|source| WalkError::SeekFailure {
                offset,
                skip,
                source,
            })
    }
}

impl<R: Read + Seek> Iterator for ArchiveWalker<R> {
    type Item = Result<EntryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

impl<R: Read + Seek> FusedIterator for ArchiveWalker<R> {}

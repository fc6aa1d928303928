//! The traversal state machine, kept free of I/O.

use log::{debug, warn};

use crate::header::{is_zero, truncate_null, Block, EntryType, Header, HeaderError, BLOCK_SIZE};

use super::config::WalkerConfig;
use super::entry::EntryRecord;
use super::error::{Result, WalkError};

const BLOCK: u64 = BLOCK_SIZE as u64;

/// What the caller should do after feeding a block to [`Cursor::step`].
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Read the next block and feed it in.
    Continue,
    /// An entry was found. Its data region of `skip` bytes follows the
    /// block just consumed and must be skipped before the next block is read.
    Entry { record: EntryRecord, skip: u64 },
    /// The end-of-archive marker was reached.
    End,
}

/// What the next block is expected to be.
#[derive(Debug)]
enum Phase {
    /// A header, or a zero block.
    Header,
    /// Data blocks of a GNU long name entry.
    LongName {
        header_offset: u64,
        len: usize,
        remaining_blocks: u64,
        data: Vec<u8>,
    },
    /// The header that the pending long name applies to.
    LongNameTarget { header_offset: u64 },
}

/// Traversal state for one walk over an archive.
///
/// Blocks are fed in stream order through [`step`]; the cursor tracks the
/// byte offset, the end-of-archive marker and GNU long names without ever
/// touching the stream itself.
///
/// [`step`]: Cursor::step
#[derive(Debug)]
pub struct Cursor {
    config: WalkerConfig,
    offset: u64,
    pending_long_name: Option<Vec<u8>>,
    consecutive_zero_blocks: u8,
    phase: Phase,
}

impl Cursor {
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            offset: 0,
            pending_long_name: None,
            consecutive_zero_blocks: 0,
            phase: Phase::Header,
        }
    }

    /// Bytes of the archive accounted for so far. Always a multiple of 512.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Consume the next block of the archive.
    pub fn step(&mut self, block: &Block) -> Result<Step> {
        match std::mem::replace(&mut self.phase, Phase::Header) {
            Phase::Header => {
                if is_zero(block) {
                    self.consecutive_zero_blocks += 1;
                    if self.consecutive_zero_blocks == 2 {
                        return Ok(Step::End);
                    }
                    self.offset += BLOCK;
                    return Ok(Step::Continue);
                }
                self.consecutive_zero_blocks = 0;
                self.header(block)
            }

            Phase::LongName {
                header_offset,
                len,
                remaining_blocks,
                mut data,
            } => {
                data.extend_from_slice(block);
                self.offset += BLOCK;
                if remaining_blocks > 1 {
                    self.phase = Phase::LongName {
                        header_offset,
                        len,
                        remaining_blocks: remaining_blocks - 1,
                        data,
                    };
                    return Ok(Step::Continue);
                }

                data.truncate(len);
                let name_len = truncate_null(&data).len();
                data.truncate(name_len);
                debug!(
                    "long name at offset {header_offset}: {:?}",
                    String::from_utf8_lossy(&data)
                );
                // An empty long name leaves the header's own name in effect.
                let previous = std::mem::replace(
                    &mut self.pending_long_name,
                    (!data.is_empty()).then_some(data),
                );
                if let Some(previous) = previous {
                    warn!(
                        "long name at offset {header_offset} replaces unused long name {:?}",
                        String::from_utf8_lossy(&previous)
                    );
                }
                self.phase = Phase::LongNameTarget { header_offset };
                Ok(Step::Continue)
            }

            // Whatever block follows a long name is its header, even an
            // all-zero one, which then yields an empty entry.
            Phase::LongNameTarget { .. } => self.header(block),
        }
    }

    /// Check whether the stream may end here.
    pub fn finish(&self) -> Result<()> {
        match self.phase {
            Phase::Header if self.consecutive_zero_blocks < 2 => {
                if self.config.require_end_marker {
                    return Err(WalkError::MissingEndMarker {
                        offset: self.offset,
                    });
                }
                warn!(
                    "archive ends at offset {} without an end-of-archive marker",
                    self.offset
                );
                Ok(())
            }
            Phase::Header => Ok(()),
            Phase::LongName { header_offset, .. } => Err(WalkError::TruncatedLongNameData {
                offset: header_offset,
            }),
            Phase::LongNameTarget { header_offset } => Err(WalkError::OrphanedLongName {
                offset: header_offset,
            }),
        }
    }

    /// The error for a stream that ends `read` bytes into the next block.
    #[must_use]
    pub fn truncated(&self, read: usize) -> WalkError {
        match self.phase {
            Phase::LongName { header_offset, .. } => WalkError::TruncatedLongNameData {
                offset: header_offset,
            },
            _ => WalkError::TruncatedRead {
                offset: self.offset,
                read,
            },
        }
    }

    fn header(&mut self, block: &Block) -> Result<Step> {
        let offset = self.offset;
        let header = Header::from_block(block);

        if self.config.verify_checksums {
            header
                .verify_checksum()
                .map_err(|source| WalkError::ChecksumMismatch { offset, source })?;
        }
        self.offset += BLOCK;

        let entry_type = header.entry_type();
        if entry_type == EntryType::GnuLongName {
            return self.long_name(header, offset);
        }

        let name = match self.pending_long_name.take() {
            Some(long_name) => long_name,
            None => header.path_bytes().into_owned(),
        };

        let size = match header.entry_size() {
            Ok(size) => size,
            Err(source) => return Err(WalkError::MalformedEntrySize { offset, name, source }),
        };

        // The skip has to land inside a u64 stream position.
        let Some(skip) = size
            .checked_next_multiple_of(BLOCK)
            .filter(|skip| self.offset.checked_add(*skip).is_some())
        else {
            let source = HeaderError::InvalidOctal(header.fields().size.to_vec());
            return Err(WalkError::MalformedEntrySize { offset, name, source });
        };

        let record = EntryRecord {
            name,
            data_offset: self.offset,
            size,
            entry_type,
        };
        self.offset += skip;
        Ok(Step::Entry { record, skip })
    }

    fn long_name(&mut self, header: &Header, offset: u64) -> Result<Step> {
        let limit = self.config.max_long_name_len;
        let size = header.entry_size().ok();
        let len = size
            .filter(|&len| len > 0 && len <= limit)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(WalkError::MalformedLongNameSize {
                offset,
                size,
                limit,
            })?;

        let remaining_blocks = (len as u64).div_ceil(BLOCK);
        self.phase = Phase::LongName {
            header_offset: offset,
            len,
            remaining_blocks,
            data: Vec::with_capacity(remaining_blocks as usize * BLOCK_SIZE),
        };
        Ok(Step::Continue)
    }
}

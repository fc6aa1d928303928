//! Index records emitted for each entry.

use std::{borrow::Cow, fmt};

use crate::header::{EntryType, BLOCK_SIZE};

/// Where an entry's data lives in the archive.
///
/// Records are produced one at a time by [`ArchiveWalker::next_entry`] and
/// are independent of the walker once returned.
///
/// [`ArchiveWalker::next_entry`]: super::ArchiveWalker::next_entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// The resolved path.
    ///
    /// Priority: GNU long name > header `prefix` + `/` + `name` > header `name`.
    pub name: Vec<u8>,

    /// Byte offset of the first byte of data, right after the entry's header.
    ///
    /// Always a multiple of 512.
    pub data_offset: u64,

    /// Declared data size in bytes.
    pub size: u64,

    /// The entry type from the header's typeflag.
    pub entry_type: EntryType,
}

impl EntryRecord {
    /// Get the name as a lossy UTF-8 string.
    #[must_use]
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Get the size of the data region, rounded up to a whole block.
    ///
    /// Returns `None` if rounding overflows.
    #[must_use]
    pub fn padded_size(&self) -> Option<u64> {
        self.size.checked_next_multiple_of(BLOCK_SIZE as u64)
    }
}

/// Formats the record as an index line, without the trailing newline.
impl fmt::Display for EntryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name_lossy(), self.data_offset, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(size: u64) -> EntryRecord {
        EntryRecord {
            name: b"dir/file.txt".to_vec(),
            data_offset: 1024,
            size,
            entry_type: EntryType::Regular,
        }
    }

    #[test]
    fn test_padded_size() {
        assert_eq!(record(0).padded_size(), Some(0));
        assert_eq!(record(1).padded_size(), Some(512));
        assert_eq!(record(512).padded_size(), Some(512));
        assert_eq!(record(513).padded_size(), Some(1024));
        assert_eq!(record(u64::MAX).padded_size(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(record(13).to_string(), "dir/file.txt 1024 13");
    }
}
